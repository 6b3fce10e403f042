//! Pluggable version ordering schemes.
//!
//! Each [`crate::model::Source`] names its scheme by identifier; the
//! [`VersioningRegistry`] maps identifiers to implementations and falls back to
//! [`NoOpVersioning`] for unknown ones.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{CompatError, ParseError, Result};
use crate::model::Version;

/// Validates and orders version strings.
pub trait Versioning: Send + Sync {
    /// Scheme identifier, e.g. `semver`.
    fn id(&self) -> &str;

    fn is_valid_version(&self, text: &str) -> bool;

    fn compare(&self, a: &Version, b: &Version) -> Result<Ordering>;

    /// Fail with [`ParseError::InvalidVersion`] unless `version` is valid.
    fn validate(&self, version: &Version) -> Result<()> {
        if self.is_valid_version(version.as_str()) {
            Ok(())
        } else {
            Err(ParseError::InvalidVersion {
                scheme: self.id().to_string(),
                version: version.to_string(),
            }
            .into())
        }
    }
}

/// Semantic Versioning 2.0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverVersioning;

impl SemverVersioning {
    fn parse(&self, version: &Version) -> Result<semver::Version> {
        semver::Version::parse(version.as_str()).map_err(|_| {
            ParseError::InvalidVersion {
                scheme: self.id().to_string(),
                version: version.to_string(),
            }
            .into()
        })
    }
}

impl Versioning for SemverVersioning {
    fn id(&self) -> &str {
        "semver"
    }

    fn is_valid_version(&self, text: &str) -> bool {
        semver::Version::parse(text).is_ok()
    }

    fn compare(&self, a: &Version, b: &Version) -> Result<Ordering> {
        Ok(self.parse(a)?.cmp(&self.parse(b)?))
    }
}

/// Plain string ordering; accepts any non-empty version.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalVersioning;

impl Versioning for LexicalVersioning {
    fn id(&self) -> &str {
        "lexical"
    }

    fn is_valid_version(&self, text: &str) -> bool {
        !text.trim().is_empty()
    }

    fn compare(&self, a: &Version, b: &Version) -> Result<Ordering> {
        Ok(a.as_str().cmp(b.as_str()))
    }
}

/// Stand-in for an unknown scheme: accepts nothing and cannot compare.
#[derive(Debug, Clone)]
pub struct NoOpVersioning {
    requested: String,
}

impl NoOpVersioning {
    pub fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
        }
    }
}

impl Versioning for NoOpVersioning {
    fn id(&self) -> &str {
        &self.requested
    }

    fn is_valid_version(&self, _text: &str) -> bool {
        false
    }

    fn compare(&self, _a: &Version, _b: &Version) -> Result<Ordering> {
        Err(CompatError::UnknownVersioning(self.requested.clone()))
    }
}

/// Identifier → scheme mapping, populated at startup.
#[derive(Clone, Default)]
pub struct VersioningRegistry {
    schemes: BTreeMap<String, Arc<dyn Versioning>>,
}

impl VersioningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `semver` and `lexical` registered.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Arc::new(SemverVersioning))
            .register(Arc::new(LexicalVersioning))
    }

    pub fn register(mut self, scheme: Arc<dyn Versioning>) -> Self {
        self.schemes.insert(scheme.id().to_string(), scheme);
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        self.schemes.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemes.contains_key(id)
    }

    /// Look up `id`, falling back to [`NoOpVersioning`].
    pub fn select(&self, id: &str) -> Arc<dyn Versioning> {
        self.schemes
            .get(id)
            .cloned()
            .unwrap_or_else(|| Arc::new(NoOpVersioning::new(id)))
    }
}

impl std::fmt::Debug for VersioningRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersioningRegistry")
            .field("schemes", &self.ids())
            .finish()
    }
}
