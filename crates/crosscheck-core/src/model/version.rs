//! Project versions and the (tag, version) pairs resolved from a project.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::tag::Tag;
use crate::versioning::Versioning;

/// Opaque project version string.
///
/// Ordering always goes through a [`Versioning`] scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Sentinel for "no version".
    pub const NONE: Version = Version(String::new());

    pub fn new(text: impl Into<String>) -> Self {
        Version(text.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare against `other` using the given scheme.
    pub fn compare(&self, other: &Version, versioning: &dyn Versioning) -> Result<Ordering> {
        versioning.compare(self, other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version::new(s)
    }
}

/// A project resolved either at its working copy or at a specific tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionContext {
    pub tag: Tag,
    pub version: Version,
}

impl VersionContext {
    pub fn new(tag: Tag, version: Version) -> Self {
        Self { tag, version }
    }

    /// Working-copy resolution, not tied to any tag.
    pub fn working_copy(version: Version) -> Self {
        Self {
            tag: Tag::NONE,
            version,
        }
    }

    /// Whether this version must be checked out before it can be built.
    pub fn requires_checkout(&self) -> bool {
        self.tag != Tag::NONE
    }
}

impl fmt::Display for VersionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requires_checkout() {
            write!(f, "{} ({})", self.version, self.tag.name())
        } else {
            write!(f, "{}", self.version)
        }
    }
}
