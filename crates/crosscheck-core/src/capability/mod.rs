//! Build-tool and VCS capabilities the engine drives.
//!
//! A [`Capability`] combines git-like operations ([`Vcs`]) with maven-like
//! operations ([`Build`]). Implementations are obtained through the
//! [`registry::BackendRegistry`]; [`NoOpCapability`] stands in when no backend is
//! available and fails every call.

pub mod maven_git;
pub mod registry;

use std::path::Path;

use async_trait::async_trait;

use crate::error::{CompatError, Result};
use crate::model::{Tag, Version};

pub use maven_git::{MavenGit, ToolConfig};
pub use registry::{BackendProvider, BackendRegistry, MavenGitProvider};

/// Version-control operations on a working tree.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `uri` into `dir`, which must be missing or empty.
    ///
    /// Read-only files produced by the clone are made writable.
    async fn clone_repo(&self, uri: &str, dir: &Path) -> Result<()>;

    /// Tags newest-first by creation date.
    async fn tags(&self, dir: &Path) -> Result<Vec<Tag>>;

    async fn checkout_tag(&self, dir: &Path, tag: &Tag) -> Result<()>;

    /// Discard modifications to tracked files. Idempotent.
    async fn restore(&self, dir: &Path) -> Result<()>;

    /// Remove untracked and ignored files. Idempotent.
    async fn clean(&self, dir: &Path) -> Result<()>;
}

/// Build-tool operations on a project directory.
#[async_trait]
pub trait Build: Send + Sync {
    /// The project's own declared version.
    async fn version(&self, dir: &Path) -> Result<Version>;

    /// Value of a build property, or `None` when it is not defined.
    async fn property(&self, dir: &Path, name: &str) -> Result<Option<String>>;

    async fn set_property(&self, dir: &Path, name: &str, value: &str) -> Result<()>;

    /// Build and install into the local artifact repository, skipping tests.
    async fn install(&self, dir: &Path) -> Result<()>;

    /// Run build and tests; returns the exit code (0 = success).
    ///
    /// A non-zero exit is a result, not an error.
    async fn verify(&self, dir: &Path) -> Result<i32>;
}

/// A complete backend.
#[async_trait]
pub trait Capability: Vcs + Build {
    fn id(&self) -> &str;

    /// Release held resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Backend used when nothing real is available; every operation fails.
#[derive(Debug, Clone)]
pub struct NoOpCapability {
    requested: String,
}

impl NoOpCapability {
    pub fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
        }
    }

    fn unavailable<T>(&self) -> Result<T> {
        Err(CompatError::Unavailable {
            capability: format!("backend '{}'", self.requested),
        })
    }
}

#[async_trait]
impl Vcs for NoOpCapability {
    async fn clone_repo(&self, _uri: &str, _dir: &Path) -> Result<()> {
        self.unavailable()
    }

    async fn tags(&self, _dir: &Path) -> Result<Vec<Tag>> {
        self.unavailable()
    }

    async fn checkout_tag(&self, _dir: &Path, _tag: &Tag) -> Result<()> {
        self.unavailable()
    }

    async fn restore(&self, _dir: &Path) -> Result<()> {
        self.unavailable()
    }

    async fn clean(&self, _dir: &Path) -> Result<()> {
        self.unavailable()
    }
}

#[async_trait]
impl Build for NoOpCapability {
    async fn version(&self, _dir: &Path) -> Result<Version> {
        self.unavailable()
    }

    async fn property(&self, _dir: &Path, _name: &str) -> Result<Option<String>> {
        self.unavailable()
    }

    async fn set_property(&self, _dir: &Path, _name: &str, _value: &str) -> Result<()> {
        self.unavailable()
    }

    async fn install(&self, _dir: &Path) -> Result<()> {
        self.unavailable()
    }

    async fn verify(&self, _dir: &Path) -> Result<i32> {
        self.unavailable()
    }
}

#[async_trait]
impl Capability for NoOpCapability {
    fn id(&self) -> &str {
        "noop"
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
