//! Backend discovery: identifier → availability check + factory.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::capability::maven_git::{MavenGit, ToolConfig, MAVEN_GIT};
use crate::capability::{Capability, NoOpCapability};
use crate::command::{GitCommandBuilder, MavenCommandBuilder};
use crate::error::{CompatError, Result};
use crate::exec::ProcessExecutor;

/// Creates a backend once its tooling has been found.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the backend's tooling is installed and runnable.
    async fn is_available(&self) -> bool;

    fn create(&self) -> Arc<dyn Capability>;
}

/// Provider for [`MavenGit`]; available when both `git --version` and
/// `mvn --version` succeed.
#[derive(Debug, Clone, Default)]
pub struct MavenGitProvider {
    config: ToolConfig,
}

impl MavenGitProvider {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendProvider for MavenGitProvider {
    fn id(&self) -> &str {
        MAVEN_GIT
    }

    async fn is_available(&self) -> bool {
        let executor = ProcessExecutor::new();
        let git = GitCommandBuilder::new()
            .binary(&self.config.git)
            .flag("version")
            .build();
        let maven = MavenCommandBuilder::new()
            .binary(&self.config.maven)
            .param("--version")
            .build();
        executor.probe(&git).await && executor.probe(&maven).await
    }

    fn create(&self) -> Arc<dyn Capability> {
        Arc::new(MavenGit::new(self.config.clone()))
    }
}

/// Registered backends, consulted in identifier order.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    providers: BTreeMap<String, Arc<dyn BackendProvider>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the Maven + git backend configured with `config`.
    pub fn with_defaults(config: ToolConfig) -> Self {
        Self::new().register(Arc::new(MavenGitProvider::new(config)))
    }

    pub fn register(mut self, provider: Arc<dyn BackendProvider>) -> Self {
        self.providers.insert(provider.id().to_string(), provider);
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    fn provider(&self, id: &str) -> Result<&Arc<dyn BackendProvider>> {
        self.providers
            .get(id)
            .ok_or_else(|| CompatError::UnknownBackend(id.to_string()))
    }

    pub async fn is_available(&self, id: &str) -> Result<bool> {
        Ok(self.provider(id)?.is_available().await)
    }

    /// Create backend `id` without checking availability.
    pub fn select(&self, id: &str) -> Result<Arc<dyn Capability>> {
        Ok(self.provider(id)?.create())
    }

    /// Availability of every registered backend.
    pub async fn probe_all(&self) -> Vec<(String, bool)> {
        let mut out = Vec::with_capacity(self.providers.len());
        for (id, provider) in &self.providers {
            out.push((id.clone(), provider.is_available().await));
        }
        out
    }

    /// Pick a backend.
    ///
    /// With `preferred` set, that backend is used if available; an unregistered
    /// identifier is an error. Otherwise the first available backend wins.
    /// When nothing is available the result is a [`NoOpCapability`].
    pub async fn select_available(&self, preferred: Option<&str>) -> Result<Arc<dyn Capability>> {
        if let Some(id) = preferred {
            let provider = self.provider(id)?;
            if provider.is_available().await {
                debug!(backend = id, "Selected backend");
                return Ok(provider.create());
            }
            warn!(backend = id, "Preferred backend is not available");
            return Ok(Arc::new(NoOpCapability::new(id)));
        }

        for (id, provider) in &self.providers {
            if provider.is_available().await {
                debug!(backend = %id, "Selected backend");
                return Ok(provider.create());
            }
        }

        warn!(registered = ?self.ids(), "No backend is available");
        Ok(Arc::new(NoOpCapability::new("any")))
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}
