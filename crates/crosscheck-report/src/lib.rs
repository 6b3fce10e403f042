//! Formatters turning a [`Report`] into text artifacts.
//!
//! The engine only produces [`Report`] values; everything that writes files or
//! streams lives here.

pub mod json;
pub mod markdown;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use crosscheck_core::Report;

pub use json::{JsonFormatter, ReportArtifact, ReportSummary, REPORT_SCHEMA_VERSION};
pub use markdown::MarkdownFormatter;

/// Renders a report to text.
pub trait ReportFormatter: Send + Sync {
    /// Registry key, e.g. `json`.
    fn id(&self) -> &str;

    /// File extension without the dot.
    fn extension(&self) -> &str;

    fn render(&self, report: &Report) -> Result<String>;
}

/// Formatter lookup by id.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: BTreeMap<String, Arc<dyn ReportFormatter>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `json` and `markdown` formatters.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Arc::new(JsonFormatter::new()))
            .register(Arc::new(MarkdownFormatter::new()))
    }

    /// Add `formatter`, replacing any with the same id.
    pub fn register(mut self, formatter: Arc<dyn ReportFormatter>) -> Self {
        self.formatters
            .insert(formatter.id().to_string(), formatter);
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        self.formatters.keys().map(String::as_str).collect()
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn ReportFormatter>> {
        self.formatters.get(id).cloned().ok_or_else(|| {
            anyhow!(
                "unknown report format '{}' (available: {})",
                id,
                self.ids().join(", ")
            )
        })
    }
}

impl std::fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.ids())
            .finish()
    }
}

/// Render `report` with `formatter` and write it to `path`, creating parent
/// directories as needed.
pub fn write_report(path: &Path, formatter: &dyn ReportFormatter, report: &Report) -> Result<()> {
    let content = formatter
        .render(report)
        .with_context(|| format!("render {} report", formatter.id()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
