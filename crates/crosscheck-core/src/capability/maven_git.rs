//! Maven + git backend built on the command builders and process executor.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capability::{Build, Capability, Vcs};
use crate::command::{Charset, GitCommandBuilder, MavenCommandBuilder, TextCommand};
use crate::error::{CompatError, Result};
use crate::exec::{self, ProcessExecutor};
use crate::model::{Tag, Version};

/// Identifier under which this backend is registered.
pub const MAVEN_GIT: &str = "maven-git";

/// What `help:evaluate` prints for an undefined expression.
const UNDEFINED_EXPRESSION: &str = "null object or invalid expression";

/// `creatordate:short` prints `YYYY-MM-DD`, which makes each line a canonical [`Tag`].
const TAG_FORMAT: &str = "%(creatordate:short)/%(refname:lstrip=2)";

/// Executables and output settings for the Maven + git backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub git: String,
    pub maven: String,
    /// Pass quiet flags to both tools.
    pub quiet: bool,
    pub charset: Charset,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            maven: "mvn".to_string(),
            quiet: true,
            charset: Charset::Utf8,
        }
    }
}

/// Backend that shells out to `git` and `mvn`.
#[derive(Debug, Default)]
pub struct MavenGit {
    config: ToolConfig,
    executor: ProcessExecutor,
    closed: AtomicBool,
}

impl MavenGit {
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            executor: ProcessExecutor::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn git(&self) -> GitCommandBuilder {
        GitCommandBuilder::new()
            .binary(&self.config.git)
            .charset(self.config.charset)
    }

    fn maven(&self, dir: &Path) -> MavenCommandBuilder {
        MavenCommandBuilder::new()
            .binary(&self.config.maven)
            .quiet(self.config.quiet)
            .directory(dir)
            .charset(self.config.charset)
    }

    pub fn clone_command(&self, uri: &str, dir: &Path) -> TextCommand {
        self.git()
            .command("clone")
            .param(uri)
            .param(dir.to_string_lossy())
            .quiet(self.config.quiet)
            .build()
    }

    pub fn tags_command(&self, dir: &Path) -> TextCommand {
        self.git()
            .directory(dir)
            .command("for-each-ref")
            .param("refs/tags")
            .option("sort", "-creatordate")
            .option("format", TAG_FORMAT)
            .build()
    }

    pub fn checkout_command(&self, dir: &Path, tag: &Tag) -> TextCommand {
        self.git()
            .config("advice.detachedHead", "false")
            .directory(dir)
            .command("checkout")
            .param(format!("refs/tags/{}", tag.name()))
            .quiet(self.config.quiet)
            .build()
    }

    pub fn restore_command(&self, dir: &Path) -> TextCommand {
        self.git()
            .directory(dir)
            .command("reset")
            .quiet(self.config.quiet)
            .flag("hard")
            .build()
    }

    pub fn clean_command(&self, dir: &Path) -> TextCommand {
        self.git()
            .directory(dir)
            .command("clean")
            .param("-f")
            .param("-d")
            .param("-x")
            .quiet(self.config.quiet)
            .build()
    }

    /// `help:evaluate` must run quiet so only the value reaches stdout.
    pub fn evaluate_command(&self, dir: &Path, expression: &str) -> TextCommand {
        self.maven(dir)
            .quiet(true)
            .goal("help:evaluate")
            .property("expression", expression)
            .property("forceStdout", "true")
            .build()
    }

    pub fn set_property_command(&self, dir: &Path, name: &str, value: &str) -> TextCommand {
        self.maven(dir)
            .goal("versions:set-property")
            .property("property", name)
            .property("newVersion", value)
            .property("generateBackupPoms", "false")
            .build()
    }

    pub fn install_command(&self, dir: &Path) -> TextCommand {
        self.maven(dir)
            .goal("install")
            .property("skipTests", "true")
            .build()
    }

    pub fn verify_command(&self, dir: &Path) -> TextCommand {
        self.maven(dir).goal("verify").build()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(CompatError::Closed(MAVEN_GIT.to_string()))
        } else {
            Ok(())
        }
    }

    async fn evaluate(&self, dir: &Path, expression: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        let value = self
            .executor
            .run(&self.evaluate_command(dir, expression), exec::first())
            .await?;
        let value = value.trim();
        if value.is_empty() || value == UNDEFINED_EXPRESSION {
            Ok(None)
        } else {
            Ok(Some(value.to_string()))
        }
    }

    async fn run_discarding(&self, command: TextCommand) -> Result<()> {
        self.ensure_open()?;
        self.executor.run(&command, exec::discard()).await?;
        Ok(())
    }
}

#[async_trait]
impl Vcs for MavenGit {
    async fn clone_repo(&self, uri: &str, dir: &Path) -> Result<()> {
        self.ensure_open()?;
        if tokio::fs::try_exists(dir).await?
            && tokio::fs::read_dir(dir).await?.next_entry().await?.is_some()
        {
            return Err(CompatError::DirectoryNotEmpty(dir.to_path_buf()));
        }
        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(uri = %uri, dir = %dir.display(), "Cloning");
        self.executor
            .run(&self.clone_command(uri, dir), exec::discard())
            .await?;

        let root = dir.to_path_buf();
        let fixed = tokio::task::spawn_blocking(move || make_writable(&root))
            .await
            .map_err(std::io::Error::other)??;
        if fixed > 0 {
            debug!(files = fixed, "Cleared read-only permissions after clone");
        }
        Ok(())
    }

    async fn tags(&self, dir: &Path) -> Result<Vec<Tag>> {
        self.ensure_open()?;
        let lines = self
            .executor
            .run(&self.tags_command(dir), exec::all())
            .await?;
        lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Tag::parse(line.trim()).map_err(CompatError::from))
            .collect()
    }

    async fn checkout_tag(&self, dir: &Path, tag: &Tag) -> Result<()> {
        self.run_discarding(self.checkout_command(dir, tag)).await
    }

    async fn restore(&self, dir: &Path) -> Result<()> {
        self.run_discarding(self.restore_command(dir)).await
    }

    async fn clean(&self, dir: &Path) -> Result<()> {
        self.run_discarding(self.clean_command(dir)).await
    }
}

#[async_trait]
impl Build for MavenGit {
    async fn version(&self, dir: &Path) -> Result<Version> {
        self.evaluate(dir, "project.version")
            .await?
            .map(Version::new)
            .ok_or_else(|| CompatError::NoVersion {
                project: dir.display().to_string(),
            })
    }

    async fn property(&self, dir: &Path, name: &str) -> Result<Option<String>> {
        self.evaluate(dir, name).await
    }

    async fn set_property(&self, dir: &Path, name: &str, value: &str) -> Result<()> {
        self.run_discarding(self.set_property_command(dir, name, value))
            .await
    }

    async fn install(&self, dir: &Path) -> Result<()> {
        info!(dir = %dir.display(), "Installing");
        self.run_discarding(self.install_command(dir)).await
    }

    async fn verify(&self, dir: &Path) -> Result<i32> {
        self.ensure_open()?;
        Ok(self.executor.status(&self.verify_command(dir)).await?)
    }
}

#[async_trait]
impl Capability for MavenGit {
    fn id(&self) -> &str {
        MAVEN_GIT
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Give the owner write permission on every entry under `root`.
///
/// Returns the number of entries changed. Symlinks are not followed.
fn make_writable(root: &Path) -> std::io::Result<usize> {
    let mut changed = 0;
    let mut pending = vec![root.to_path_buf()];

    while let Some(path) = pending.pop() {
        let meta = std::fs::symlink_metadata(&path)?;
        if meta.file_type().is_symlink() {
            continue;
        }
        if meta.permissions().readonly() {
            std::fs::set_permissions(&path, writable(meta.permissions()))?;
            changed += 1;
        }
        if meta.is_dir() {
            for entry in std::fs::read_dir(&path)? {
                pending.push(entry?.path());
            }
        }
    }

    Ok(changed)
}

#[cfg(unix)]
fn writable(permissions: std::fs::Permissions) -> std::fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    std::fs::Permissions::from_mode(permissions.mode() | 0o200)
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn writable(mut permissions: std::fs::Permissions) -> std::fs::Permissions {
    permissions.set_readonly(false);
    permissions
}
