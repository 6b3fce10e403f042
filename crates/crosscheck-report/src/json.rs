//! Pretty JSON artifact for CI consumption.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use crosscheck_core::{Report, ReportItem};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::ReportFormatter;

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Pass/fail counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Persisted form of a [`Report`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportArtifact {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the serialized items; equal results give equal digests.
    pub report_digest: String,
    pub summary: ReportSummary,
    pub items: Vec<ReportItem>,
}

impl ReportArtifact {
    pub fn from_report(report: &Report, generated_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id: Uuid::new_v4(),
            generated_at,
            report_digest: report_digest(report)?,
            summary: ReportSummary {
                total: report.len(),
                passed: report.passed(),
                failed: report.failed(),
            },
            items: report.items().to_vec(),
        })
    }
}

/// Hex SHA-256 over the report's canonical JSON.
pub fn report_digest(report: &Report) -> Result<String> {
    let bytes = serde_json::to_vec(report).context("serialize report items")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for JsonFormatter {
    fn id(&self) -> &str {
        "json"
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn render(&self, report: &Report) -> Result<String> {
        let artifact = ReportArtifact::from_report(report, Utc::now())?;
        serde_json::to_string_pretty(&artifact).context("serialize report artifact")
    }
}
