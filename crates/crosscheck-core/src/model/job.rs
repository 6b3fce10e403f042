//! Job input: which sources to validate against which targets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::filter::Filter;

const FILE_SCHEME: &str = "file://";

/// The artifact whose current version is validated against downstream targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    /// Versioning scheme identifier, e.g. `semver`.
    pub versioning: String,
    #[serde(default)]
    pub filter: Filter,
}

/// A downstream project rebuilt at each selected tag with the source injected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub uri: String,
    /// Build property pinning the source's version, e.g. `lib.version`.
    pub property: String,
    #[serde(default)]
    pub filter: Filter,
}

/// A complete test matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub targets: Vec<Target>,
    /// Parent directory for scratch clones.
    pub working_dir: PathBuf,
    /// Preferred backend identifier; the first available one is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

impl Job {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources: Vec::new(),
            targets: Vec::new(),
            working_dir: working_dir.into(),
            backend: None,
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    /// Number of (source, target) pairs in the matrix.
    pub fn pair_count(&self) -> usize {
        self.sources.len() * self.targets.len()
    }
}

/// Either side of the matrix, viewed through the fields both share.
#[derive(Debug, Clone, Copy)]
pub enum Project<'a> {
    Source(&'a Source),
    Target(&'a Target),
}

impl<'a> Project<'a> {
    pub fn uri(&self) -> &'a str {
        match self {
            Project::Source(s) => &s.uri,
            Project::Target(t) => &t.uri,
        }
    }

    pub fn filter(&self) -> &'a Filter {
        match self {
            Project::Source(s) => &s.filter,
            Project::Target(t) => &t.filter,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Project::Source(_) => "source",
            Project::Target(_) => "target",
        }
    }

    /// Filesystem path when the URI names a local directory.
    pub fn local_path(&self) -> Option<PathBuf> {
        local_path(self.uri())
    }
}

/// Resolve `file://` URIs and plain paths; anything with another scheme is remote.
pub fn local_path(uri: &str) -> Option<PathBuf> {
    if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
        return Some(PathBuf::from(path));
    }
    if uri.contains("://") || is_scp_like(uri) {
        return None;
    }
    Some(Path::new(uri).to_path_buf())
}

/// `user@host:path` as accepted by git.
fn is_scp_like(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((host, _)) => host.contains('@') && !host.contains('/'),
        None => false,
    }
}
