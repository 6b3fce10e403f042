//! In-memory capability for tests.
//!
//! [`ScriptedCapability`] serves scripted repositories keyed by URI, keeps a
//! per-directory working tree, and records every call so tests can assert the
//! exact sequence the orchestrator issued.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capability::{Build, Capability, Vcs};
use crate::error::{CompatError, ExecError, Result};
use crate::model::{Tag, Version};

// ---------------------------------------------------------------------------
// Scripted repositories
// ---------------------------------------------------------------------------

/// Project version and build properties at one point in history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub version: String,
    pub properties: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A repository: its head plus tags in the order `tags` reports them
/// (newest-first).
#[derive(Debug, Clone, Default)]
pub struct ScriptedRepo {
    head: Snapshot,
    tags: Vec<(Tag, Snapshot)>,
}

impl ScriptedRepo {
    pub fn new(head: Snapshot) -> Self {
        Self {
            head,
            tags: Vec::new(),
        }
    }

    /// Append a tag; `tag` uses the `<date>/<name>` form.
    ///
    /// # Panics
    /// If `tag` does not parse.
    pub fn with_tag(mut self, tag: &str, snapshot: Snapshot) -> Self {
        let tag = Tag::parse(tag).unwrap_or_else(|e| panic!("bad scripted tag {tag}: {e}"));
        self.tags.push((tag, snapshot));
        self
    }
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Clone { uri: String, dir: PathBuf },
    Tags(PathBuf),
    Checkout(PathBuf, String),
    Restore(PathBuf),
    Clean(PathBuf),
    Version(PathBuf),
    Property(PathBuf, String),
    SetProperty(PathBuf, String, String),
    Install(PathBuf),
    Verify(PathBuf),
    Close,
}

impl Call {
    /// Operation name without arguments, e.g. `checkout`.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Clone { .. } => "clone",
            Call::Tags(_) => "tags",
            Call::Checkout(..) => "checkout",
            Call::Restore(_) => "restore",
            Call::Clean(_) => "clean",
            Call::Version(_) => "version",
            Call::Property(..) => "property",
            Call::SetProperty(..) => "set_property",
            Call::Install(_) => "install",
            Call::Verify(_) => "verify",
            Call::Close => "close",
        }
    }
}

/// What the verifier sees for one verify call.
#[derive(Debug, Clone)]
pub struct Verification {
    pub uri: String,
    pub version: String,
    /// Properties as currently written in the tree.
    pub properties: BTreeMap<String, String>,
    /// Properties as committed at the checked-out revision.
    pub committed: BTreeMap<String, String>,
}

type Verifier = Box<dyn Fn(&Verification) -> i32 + Send + Sync>;
type FailurePredicate = Box<dyn Fn(&Call) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct Tree {
    uri: String,
    committed: Snapshot,
    current: Snapshot,
}

#[derive(Debug, Default)]
struct State {
    trees: HashMap<PathBuf, Tree>,
    calls: Vec<Call>,
    installed: Vec<(String, String)>,
    closed: bool,
}

// ---------------------------------------------------------------------------
// ScriptedCapability
// ---------------------------------------------------------------------------

/// Capability backed by in-memory repositories.
///
/// Clones create the directory on disk with a marker file so cleanup can be
/// observed; everything else happens in memory. Checking out over a modified
/// tree fails, as git would.
pub struct ScriptedCapability {
    repos: HashMap<String, ScriptedRepo>,
    state: Mutex<State>,
    verifier: Verifier,
    fail_when: Option<FailurePredicate>,
}

impl Default for ScriptedCapability {
    fn default() -> Self {
        Self {
            repos: HashMap::new(),
            state: Mutex::new(State::default()),
            verifier: Box::new(|_| 0),
            fail_when: None,
        }
    }
}

impl ScriptedCapability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `repo` to clones of `uri`.
    pub fn with_repo(mut self, uri: impl Into<String>, repo: ScriptedRepo) -> Self {
        self.repos.insert(uri.into(), repo);
        self
    }

    /// Treat `dir` as an existing local checkout of `repo` at its head.
    pub fn with_local(self, dir: impl Into<PathBuf>, repo: ScriptedRepo) -> Self {
        let dir = dir.into();
        let uri = dir.display().to_string();
        {
            let mut state = self.state.lock().unwrap();
            state.trees.insert(
                dir,
                Tree {
                    uri: uri.clone(),
                    committed: repo.head.clone(),
                    current: repo.head.clone(),
                },
            );
        }
        self.with_repo(uri, repo)
    }

    /// Exit code for each verify call; defaults to always 0.
    pub fn with_verifier(
        mut self,
        f: impl Fn(&Verification) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.verifier = Box::new(f);
        self
    }

    /// Fail every call matching `f` with an abnormal exit.
    pub fn fail_when(mut self, f: impl Fn(&Call) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when = Some(Box::new(f));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Operation names in call order.
    pub fn call_names(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.iter().map(Call::name).collect()
    }

    /// `(uri, version)` for each install, in order.
    pub fn installed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().installed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn record(&self, call: Call) -> Result<()> {
        let fail = self.fail_when.as_ref().is_some_and(|f| f(&call));
        let name = call.name();
        self.state.lock().unwrap().calls.push(call);
        if fail {
            return Err(abnormal(name, "injected failure"));
        }
        Ok(())
    }

    fn with_tree<T>(&self, dir: &Path, f: impl FnOnce(&mut Tree) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().unwrap();
        let tree = state.trees.get_mut(dir).ok_or_else(|| {
            CompatError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no working tree at {}", dir.display()),
            ))
        })?;
        f(tree)
    }
}

fn abnormal(program: &str, stderr: &str) -> CompatError {
    ExecError::AbnormalExit {
        program: program.to_string(),
        code: 128,
        stderr: stderr.to_string(),
    }
    .into()
}

#[async_trait]
impl Vcs for ScriptedCapability {
    async fn clone_repo(&self, uri: &str, dir: &Path) -> Result<()> {
        self.record(Call::Clone {
            uri: uri.to_string(),
            dir: dir.to_path_buf(),
        })?;
        let repo = self
            .repos
            .get(uri)
            .ok_or_else(|| abnormal("clone", "repository not found"))?;
        if dir.exists() && std::fs::read_dir(dir)?.next().is_some() {
            return Err(CompatError::DirectoryNotEmpty(dir.to_path_buf()));
        }
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(".scripted"), uri)?;

        self.state.lock().unwrap().trees.insert(
            dir.to_path_buf(),
            Tree {
                uri: uri.to_string(),
                committed: repo.head.clone(),
                current: repo.head.clone(),
            },
        );
        Ok(())
    }

    async fn tags(&self, dir: &Path) -> Result<Vec<Tag>> {
        self.record(Call::Tags(dir.to_path_buf()))?;
        let uri = self.with_tree(dir, |tree| Ok(tree.uri.clone()))?;
        Ok(self
            .repos
            .get(&uri)
            .map(|repo| repo.tags.iter().map(|(tag, _)| tag.clone()).collect())
            .unwrap_or_default())
    }

    async fn checkout_tag(&self, dir: &Path, tag: &Tag) -> Result<()> {
        self.record(Call::Checkout(dir.to_path_buf(), tag.name().to_string()))?;
        let repos = &self.repos;
        self.with_tree(dir, |tree| {
            if tree.current != tree.committed {
                return Err(abnormal("checkout", "local changes would be overwritten"));
            }
            let snapshot = repos
                .get(&tree.uri)
                .and_then(|repo| repo.tags.iter().find(|(t, _)| t.name() == tag.name()))
                .map(|(_, snapshot)| snapshot.clone())
                .ok_or_else(|| abnormal("checkout", "pathspec did not match"))?;
            tree.committed = snapshot.clone();
            tree.current = snapshot;
            Ok(())
        })
    }

    async fn restore(&self, dir: &Path) -> Result<()> {
        self.record(Call::Restore(dir.to_path_buf()))?;
        self.with_tree(dir, |tree| {
            tree.current = tree.committed.clone();
            Ok(())
        })
    }

    async fn clean(&self, dir: &Path) -> Result<()> {
        self.record(Call::Clean(dir.to_path_buf()))?;
        self.with_tree(dir, |_| Ok(()))
    }
}

#[async_trait]
impl Build for ScriptedCapability {
    async fn version(&self, dir: &Path) -> Result<Version> {
        self.record(Call::Version(dir.to_path_buf()))?;
        self.with_tree(dir, |tree| {
            if tree.current.version.is_empty() {
                Err(CompatError::NoVersion {
                    project: tree.uri.clone(),
                })
            } else {
                Ok(Version::new(tree.current.version.as_str()))
            }
        })
    }

    async fn property(&self, dir: &Path, name: &str) -> Result<Option<String>> {
        self.record(Call::Property(dir.to_path_buf(), name.to_string()))?;
        self.with_tree(dir, |tree| Ok(tree.current.properties.get(name).cloned()))
    }

    async fn set_property(&self, dir: &Path, name: &str, value: &str) -> Result<()> {
        self.record(Call::SetProperty(
            dir.to_path_buf(),
            name.to_string(),
            value.to_string(),
        ))?;
        self.with_tree(dir, |tree| {
            tree.current
                .properties
                .insert(name.to_string(), value.to_string());
            Ok(())
        })
    }

    async fn install(&self, dir: &Path) -> Result<()> {
        self.record(Call::Install(dir.to_path_buf()))?;
        let installed = self.with_tree(dir, |tree| {
            Ok((tree.uri.clone(), tree.current.version.clone()))
        })?;
        self.state.lock().unwrap().installed.push(installed);
        Ok(())
    }

    async fn verify(&self, dir: &Path) -> Result<i32> {
        self.record(Call::Verify(dir.to_path_buf()))?;
        let verification = self.with_tree(dir, |tree| {
            Ok(Verification {
                uri: tree.uri.clone(),
                version: tree.current.version.clone(),
                properties: tree.current.properties.clone(),
                committed: tree.committed.properties.clone(),
            })
        })?;
        Ok((self.verifier)(&verification))
    }
}

#[async_trait]
impl Capability for ScriptedCapability {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn close(&self) -> Result<()> {
        self.record(Call::Close)?;
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ScriptedRepo {
        ScriptedRepo::new(Snapshot::new("2.0.0-SNAPSHOT").with_property("lib.version", "9.9.9"))
            .with_tag("2024-02-01/v1.1", Snapshot::new("1.1").with_property("lib.version", "1.1.0"))
            .with_tag("2024-01-01/v1.0", Snapshot::new("1.0").with_property("lib.version", "1.0.0"))
    }

    #[tokio::test]
    async fn test_clone_checkout_and_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("app");
        let cap = ScriptedCapability::new().with_repo("mem://app", repo());

        cap.clone_repo("mem://app", &dir).await.unwrap();
        assert!(dir.join(".scripted").exists());

        let tags = cap.tags(&dir).await.unwrap();
        assert_eq!(tags[0].name(), "v1.1");

        cap.checkout_tag(&dir, &tags[1]).await.unwrap();
        assert_eq!(cap.version(&dir).await.unwrap(), Version::new("1.0"));

        cap.set_property(&dir, "lib.version", "2.0.0").await.unwrap();
        assert!(cap.checkout_tag(&dir, &tags[0]).await.is_err());

        cap.restore(&dir).await.unwrap();
        assert_eq!(
            cap.property(&dir, "lib.version").await.unwrap().as_deref(),
            Some("1.0.0")
        );
        cap.checkout_tag(&dir, &tags[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_clone_into_populated_directory_fails() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("file"), b"x").unwrap();
        let cap = ScriptedCapability::new().with_repo("mem://app", repo());
        assert!(matches!(
            cap.clone_repo("mem://app", tmp.path()).await,
            Err(CompatError::DirectoryNotEmpty(_))
        ));
    }

    #[tokio::test]
    async fn test_fail_when_records_then_fails() {
        let cap = ScriptedCapability::new()
            .with_local("/local/lib", repo())
            .fail_when(|call| matches!(call, Call::Install(_)));

        assert!(cap.install(Path::new("/local/lib")).await.is_err());
        assert_eq!(cap.call_names(), vec!["install"]);
        assert!(cap.installed().is_empty());
    }

    #[tokio::test]
    async fn test_verifier_sees_current_and_committed_properties() {
        let cap = ScriptedCapability::new()
            .with_local("/local/app", repo())
            .with_verifier(|v| {
                i32::from(v.properties.get("lib.version") != v.committed.get("lib.version"))
            });
        let dir = Path::new("/local/app");

        assert_eq!(cap.verify(dir).await.unwrap(), 0);
        cap.set_property(dir, "lib.version", "3.0.0").await.unwrap();
        assert_eq!(cap.verify(dir).await.unwrap(), 1);
        cap.close().await.unwrap();
        assert!(cap.is_closed());
    }
}
