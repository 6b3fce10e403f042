//! Job results: one item per (source version, target tag) pair.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Version, VersionContext};
use crate::versioning::Versioning;

/// Outcome of a verify run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    Failure { code: i32 },
}

impl ExitStatus {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Failure { code }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure { code } => *code,
        }
    }
}

/// One source version injected into one target tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    pub exit_status: ExitStatus,
    pub source_uri: String,
    pub source_version: VersionContext,
    pub target_uri: String,
    pub target_version: VersionContext,
    /// Build property the source version was written to.
    pub property: String,
    /// Value the target pinned before injection.
    pub baseline: String,
}

/// Ordered, immutable job result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    items: Vec<ReportItem>,
}

impl Report {
    pub fn builder() -> ReportBuilder {
        ReportBuilder::default()
    }

    pub fn items(&self) -> &[ReportItem] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn passed(&self) -> usize {
        self.iter().filter(|i| i.exit_status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.passed()
    }

    /// Distinct (source, target) URI pairs in first-seen order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for item in &self.items {
            let pair = (item.source_uri.as_str(), item.target_uri.as_str());
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }

    pub fn items_for<'a>(
        &'a self,
        source_uri: &'a str,
        target_uri: &'a str,
    ) -> impl Iterator<Item = &'a ReportItem> + 'a {
        self.iter()
            .filter(move |i| i.source_uri == source_uri && i.target_uri == target_uri)
    }

    /// Distinct versions of `source_uri`, ascending under `versioning`.
    ///
    /// Fails if any version is invalid for the scheme.
    pub fn source_versions(
        &self,
        source_uri: &str,
        versioning: &dyn Versioning,
    ) -> Result<Vec<Version>> {
        let mut versions: Vec<Version> = Vec::new();
        for item in self.iter().filter(|i| i.source_uri == source_uri) {
            let version = &item.source_version.version;
            if !versions.contains(version) {
                versioning.validate(version)?;
                versions.push(version.clone());
            }
        }
        versions.sort_by(|a, b| versioning.compare(a, b).unwrap_or(Ordering::Equal));
        Ok(versions)
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a ReportItem;
    type IntoIter = std::slice::Iter<'a, ReportItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Append-only accumulator; [`ReportBuilder::build`] freezes it.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    items: Vec<ReportItem>,
}

impl ReportBuilder {
    pub fn push(&mut self, item: ReportItem) -> &mut Self {
        self.items.push(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn build(self) -> Report {
        Report { items: self.items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;
    use crate::versioning::SemverVersioning;

    fn item(source: &str, version: &str, target_tag: &str, code: i32) -> ReportItem {
        ReportItem {
            exit_status: ExitStatus::from_code(code),
            source_uri: source.to_string(),
            source_version: VersionContext::working_copy(version.into()),
            target_uri: "https://example.com/app.git".to_string(),
            target_version: VersionContext::new(
                Tag::new(None, target_tag).unwrap(),
                "1.0.0".into(),
            ),
            property: "lib.version".to_string(),
            baseline: "1.0.0".to_string(),
        }
    }

    #[test]
    fn test_exit_status_from_code() {
        assert_eq!(ExitStatus::from_code(0), ExitStatus::Success);
        assert_eq!(ExitStatus::from_code(2), ExitStatus::Failure { code: 2 });
        assert_eq!(ExitStatus::from_code(2).code(), 2);
        assert!(!ExitStatus::from_code(-1).is_success());
    }

    #[test]
    fn test_exit_status_json_shape() {
        let json = serde_json::to_value(ExitStatus::Failure { code: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failure", "code": 1}));
        let json = serde_json::to_value(ExitStatus::Success).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success"}));
    }

    #[test]
    fn test_builder_preserves_order_and_counts() {
        let mut builder = Report::builder();
        builder
            .push(item("lib", "2.0.0", "v1", 0))
            .push(item("lib", "2.0.0", "v2", 1))
            .push(item("lib", "2.0.0", "v3", 0));
        assert_eq!(builder.len(), 3);

        let report = builder.build();
        let tags: Vec<_> = report.iter().map(|i| i.target_version.tag.name()).collect();
        assert_eq!(tags, vec!["v1", "v2", "v3"]);
        assert_eq!(report.passed(), 2);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_source_versions_are_ordered_by_scheme() {
        let mut builder = Report::builder();
        builder
            .push(item("lib", "1.10.0", "v1", 0))
            .push(item("lib", "1.9.0", "v1", 0))
            .push(item("lib", "1.10.0", "v2", 0))
            .push(item("other", "0.1.0", "v1", 0));
        let report = builder.build();

        let versions = report.source_versions("lib", &SemverVersioning).unwrap();
        assert_eq!(versions, vec![Version::new("1.9.0"), Version::new("1.10.0")]);
        assert_eq!(report.pairs().len(), 2);
        assert_eq!(report.items_for("lib", "https://example.com/app.git").count(), 3);
    }

    #[test]
    fn test_source_versions_rejects_invalid() {
        let mut builder = Report::builder();
        builder.push(item("lib", "not-a-version", "v1", 0));
        assert!(builder
            .build()
            .source_versions("lib", &SemverVersioning)
            .is_err());
    }

    #[test]
    fn test_empty_report() {
        let report = Report::default();
        assert!(report.is_empty());
        assert_eq!(report.failed(), 0);
        assert!(report.pairs().is_empty());
    }
}
