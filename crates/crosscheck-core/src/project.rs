//! Materialized projects: a directory plus the versions resolved from it.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capability::Capability;
use crate::error::{CompatError, Result};
use crate::model::{Project, VersionContext};

/// A project checked out on disk for the duration of a job.
///
/// Remote projects are cloned into a scratch directory owned by the context and
/// removed by [`ProjectContext::clean`]. Local projects are used in place and
/// never deleted.
#[derive(Debug)]
pub struct ProjectContext<'a> {
    project: Project<'a>,
    directory: PathBuf,
    delete_on_exit: bool,
    versions: Vec<VersionContext>,
}

impl<'a> ProjectContext<'a> {
    /// Reuse a local directory, or clone when the URI is remote.
    pub async fn open(
        project: Project<'a>,
        working_dir: &Path,
        capability: &dyn Capability,
    ) -> Result<Self> {
        match project.local_path() {
            Some(dir) => Self::open_local(project, dir, capability).await,
            None => Self::open_remote(project, working_dir, capability).await,
        }
    }

    /// Use `dir` in place; records a single working-copy version.
    pub async fn open_local(
        project: Project<'a>,
        dir: PathBuf,
        capability: &dyn Capability,
    ) -> Result<Self> {
        let version = capability.version(&dir).await?;
        debug!(
            kind = project.kind(),
            dir = %dir.display(),
            version = %version,
            "Resolved local project"
        );
        Ok(Self {
            project,
            directory: dir,
            delete_on_exit: false,
            versions: vec![VersionContext::working_copy(version)],
        })
    }

    /// Clone into a fresh directory under `working_dir` and resolve the version
    /// at every tag the project's filter selects, oldest-first.
    ///
    /// The scratch directory is removed again if resolution fails.
    pub async fn open_remote(
        project: Project<'a>,
        working_dir: &Path,
        capability: &dyn Capability,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(working_dir).await?;
        let mut context = Self {
            project,
            directory: working_dir.join(scratch_name(project)),
            delete_on_exit: true,
            versions: Vec::new(),
        };

        match context.resolve_tags(capability).await {
            Ok(()) => Ok(context),
            Err(e) => {
                let dir = context.directory.clone();
                if let Err(cleanup) = context.clean().await {
                    warn!(dir = %dir.display(), error = %cleanup, "Failed to remove scratch clone");
                }
                Err(e)
            }
        }
    }

    async fn resolve_tags(&mut self, capability: &dyn Capability) -> Result<()> {
        let dir = self.directory.as_path();
        capability.clone_repo(self.project.uri(), dir).await?;

        let tags = capability.tags(dir).await?;
        let selected = self.project.filter().apply(&tags);
        info!(
            uri = %self.project.uri(),
            tags = tags.len(),
            selected = selected.len(),
            "Enumerated tags"
        );

        for tag in selected {
            capability.checkout_tag(dir, &tag).await?;
            let version = capability.version(dir).await?;
            capability.clean(dir).await?;
            capability.restore(dir).await?;
            debug!(tag = %tag, version = %version, "Resolved tag");
            self.versions.push(VersionContext::new(tag, version));
        }
        Ok(())
    }

    pub fn project(&self) -> Project<'a> {
        self.project
    }

    pub fn uri(&self) -> &'a str {
        self.project.uri()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn delete_on_exit(&self) -> bool {
        self.delete_on_exit
    }

    /// Resolved versions in filter order.
    pub fn versions(&self) -> &[VersionContext] {
        &self.versions
    }

    /// Remove the scratch directory if this context owns one.
    pub async fn clean(self) -> Result<()> {
        if !self.delete_on_exit {
            return Ok(());
        }
        match tokio::fs::remove_dir_all(&self.directory).await {
            Ok(()) => {
                debug!(dir = %self.directory.display(), "Removed scratch clone");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CompatError::Io(e)),
        }
    }
}

/// `<kind>-<last uri segment>-<uuid>`, safe as a single path component.
fn scratch_name(project: Project<'_>) -> String {
    let uri = project.uri().trim_end_matches('/');
    let last = uri
        .rsplit(['/', ':', '\\'])
        .next()
        .unwrap_or(uri)
        .trim_end_matches(".git");
    let slug: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let slug = if slug.is_empty() { "project" } else { slug.as_str() };
    format!("{}-{}-{}", project.kind(), slug, Uuid::new_v4().simple())
}
