//! Markdown matrix: one table per (source, target) pair.
//!
//! Rows are target tags in report order (oldest first), columns are source
//! versions ordered by the source's versioning scheme.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use crosscheck_core::{
    Job, LexicalVersioning, Report, ReportItem, Version, VersionContext, Versioning,
    VersioningRegistry,
};

use crate::ReportFormatter;

const PASS: &str = "✓";
const FAIL: &str = "✗";

#[derive(Clone)]
pub struct MarkdownFormatter {
    schemes: HashMap<String, Arc<dyn Versioning>>,
    fallback: Arc<dyn Versioning>,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self {
            schemes: HashMap::new(),
            fallback: Arc::new(LexicalVersioning),
        }
    }
}

impl MarkdownFormatter {
    /// Orders every source's versions lexically.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use each source's declared scheme from `job`.
    pub fn for_job(job: &Job, versioning: &VersioningRegistry) -> Self {
        job.sources.iter().fold(Self::new(), |formatter, source| {
            formatter.with_scheme(&source.uri, versioning.select(&source.versioning))
        })
    }

    pub fn with_scheme(mut self, source_uri: &str, scheme: Arc<dyn Versioning>) -> Self {
        self.schemes.insert(source_uri.to_string(), scheme);
        self
    }

    fn scheme(&self, source_uri: &str) -> &dyn Versioning {
        self.schemes
            .get(source_uri)
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    fn render_pair(
        &self,
        out: &mut String,
        report: &Report,
        source: &str,
        target: &str,
    ) -> Result<()> {
        let columns = report
            .source_versions(source, self.scheme(source))
            .with_context(|| format!("order versions of {source}"))?;
        let items: Vec<&ReportItem> = report.items_for(source, target).collect();

        let mut rows: Vec<&VersionContext> = Vec::new();
        for item in &items {
            if !rows.contains(&&item.target_version) {
                rows.push(&item.target_version);
            }
        }

        out.push_str(&format!("## {} → {}\n\n", escape(source), escape(target)));
        if let Some(first) = items.first() {
            out.push_str(&format!("Property: `{}`\n\n", first.property));
        }

        out.push_str("| Target | Baseline |");
        for version in &columns {
            out.push_str(&format!(" {} |", escape(version.as_str())));
        }
        out.push_str("\n|---|---|");
        out.push_str(&"---|".repeat(columns.len()));
        out.push('\n');

        for row in rows {
            let in_row: Vec<&&ReportItem> = items
                .iter()
                .filter(|i| &i.target_version == row)
                .collect();
            let baseline = in_row.first().map(|i| i.baseline.as_str()).unwrap_or("");
            out.push_str(&format!(
                "| {} | {} |",
                escape(&row.to_string()),
                escape(baseline)
            ));
            for version in &columns {
                out.push_str(&format!(" {} |", cell(&in_row, version)));
            }
            out.push('\n');
        }
        out.push('\n');
        Ok(())
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn id(&self) -> &str {
        "markdown"
    }

    fn extension(&self) -> &str {
        "md"
    }

    fn render(&self, report: &Report) -> Result<String> {
        let mut out = String::from("# Compatibility Report\n\n");
        if report.is_empty() {
            out.push_str("No compatibility results.\n");
            return Ok(out);
        }

        out.push_str(&format!(
            "{} combinations: {} passed, {} failed.\n\n",
            report.len(),
            report.passed(),
            report.failed()
        ));
        for (source, target) in report.pairs() {
            self.render_pair(&mut out, report, source, target)?;
        }
        Ok(out)
    }
}

fn cell(items: &[&&ReportItem], version: &Version) -> String {
    match items.iter().find(|i| &i.source_version.version == version) {
        Some(item) if item.exit_status.is_success() => PASS.to_string(),
        Some(item) => format!("{} ({})", FAIL, item.exit_status.code()),
        None => "-".to_string(),
    }
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}
