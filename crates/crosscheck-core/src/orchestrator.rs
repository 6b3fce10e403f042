//! The source × target × tag matrix loop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::capability::Capability;
use crate::error::{CompatError, Result};
use crate::model::{Job, Project, Source, Target, VersionContext};
use crate::project::ProjectContext;
use crate::report::{ExitStatus, Report, ReportBuilder, ReportItem};
use crate::versioning::VersioningRegistry;

/// Runs a [`Job`] to a [`Report`].
#[async_trait]
pub trait JobEngine: Send + Sync {
    async fn run(&self, job: &Job) -> Result<Report>;
}

/// Engine used when no capability is available; always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpJobEngine;

#[async_trait]
impl JobEngine for NoOpJobEngine {
    async fn run(&self, _job: &Job) -> Result<Report> {
        Err(CompatError::Unavailable {
            capability: "job engine".to_string(),
        })
    }
}

/// Drives a [`Capability`] through every (source version, target tag) pair.
///
/// Steps are awaited one at a time against a single working tree per project,
/// so items appear in the report in processing order. Any failure other than
/// a non-zero verify exit aborts the job. Scratch clones are removed either way.
pub struct CompatibilityOrchestrator {
    capability: Arc<dyn Capability>,
    versioning: VersioningRegistry,
}

impl CompatibilityOrchestrator {
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        Self {
            capability,
            versioning: VersioningRegistry::with_defaults(),
        }
    }

    pub fn with_versioning(mut self, versioning: VersioningRegistry) -> Self {
        self.versioning = versioning;
        self
    }

    pub fn capability(&self) -> &Arc<dyn Capability> {
        &self.capability
    }

    /// Validate and install every resolved version of a source, then run it
    /// against each target.
    async fn run_source(
        &self,
        job: &Job,
        source: &Source,
        context: &ProjectContext<'_>,
        report: &mut ReportBuilder,
    ) -> Result<()> {
        let cap = self.capability.as_ref();
        let dir = context.directory();
        let scheme = self.versioning.select(&source.versioning);

        for resolved in context.versions() {
            scheme.validate(&resolved.version)?;
        }

        for resolved in context.versions() {
            if resolved.requires_checkout() {
                cap.checkout_tag(dir, &resolved.tag).await?;
            }
            info!(uri = %source.uri, version = %resolved, "Installing source");
            cap.install(dir).await?;
            if resolved.requires_checkout() {
                cap.clean(dir).await?;
                cap.restore(dir).await?;
            }
        }

        for target in &job.targets {
            let target_context =
                ProjectContext::open_remote(Project::Target(target), &job.working_dir, cap).await?;
            let outcome = self
                .run_target(source, context.versions(), target, &target_context, report)
                .await;
            release(target_context, outcome).await?;
        }
        Ok(())
    }

    /// Inject each source version into each selected target tag and verify.
    async fn run_target(
        &self,
        source: &Source,
        source_versions: &[VersionContext],
        target: &Target,
        context: &ProjectContext<'_>,
        report: &mut ReportBuilder,
    ) -> Result<()> {
        let cap = self.capability.as_ref();
        let dir = context.directory();

        for target_version in context.versions() {
            if target_version.requires_checkout() {
                cap.checkout_tag(dir, &target_version.tag).await?;
            }

            let baseline = cap
                .property(dir, &target.property)
                .await?
                .ok_or_else(|| CompatError::PropertyUndefined {
                    project: format!("{} at {}", target.uri, target_version),
                    property: target.property.clone(),
                })?;

            for source_version in source_versions {
                cap.set_property(dir, &target.property, source_version.version.as_str())
                    .await?;
                let exit_status = ExitStatus::from_code(cap.verify(dir).await?);
                info!(
                    source = %source.uri,
                    source_version = %source_version,
                    target = %target.uri,
                    target_version = %target_version,
                    baseline = %baseline,
                    exit_code = exit_status.code(),
                    "Verified"
                );

                report.push(ReportItem {
                    exit_status,
                    source_uri: source.uri.clone(),
                    source_version: source_version.clone(),
                    target_uri: target.uri.clone(),
                    target_version: target_version.clone(),
                    property: target.property.clone(),
                    baseline: baseline.clone(),
                });

                cap.clean(dir).await?;
                cap.restore(dir).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl JobEngine for CompatibilityOrchestrator {
    async fn run(&self, job: &Job) -> Result<Report> {
        let mut report = Report::builder();
        if job.pair_count() == 0 {
            info!(
                sources = job.sources.len(),
                targets = job.targets.len(),
                "Job has no source/target pairs"
            );
            return Ok(report.build());
        }

        info!(
            sources = job.sources.len(),
            targets = job.targets.len(),
            backend = self.capability.id(),
            "Starting compatibility job"
        );

        for source in &job.sources {
            let context = ProjectContext::open(
                Project::Source(source),
                &job.working_dir,
                self.capability.as_ref(),
            )
            .await?;
            let outcome = self.run_source(job, source, &context, &mut report).await;
            release(context, outcome).await?;
        }

        let report = report.build();
        info!(
            items = report.len(),
            passed = report.passed(),
            failed = report.failed(),
            "Compatibility job finished"
        );
        Ok(report)
    }
}

/// Tear down `context` and hand back `outcome`; cleanup failures are only logged.
async fn release<T>(context: ProjectContext<'_>, outcome: Result<T>) -> Result<T> {
    let dir = context.directory().to_path_buf();
    if let Err(e) = context.clean().await {
        warn!(dir = %dir.display(), error = %e, "Failed to remove scratch clone");
    }
    outcome
}
