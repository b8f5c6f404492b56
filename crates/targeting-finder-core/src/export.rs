//! Export transforms over the selection set.
//!
//! - [`to_csv`]: `id,name,audience_size` with every value quoted; unknown
//!   sizes become a `~`-prefixed cosmetic estimate.
//! - [`to_json`]: entries verbatim, `null` preserved.
//! - [`copy_to_clipboard`]: JSON text through a primary sink with a
//!   fallback sink.

use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;

use crate::models::TaxonomyItem;
use crate::selection::estimate_audience_size;

/// CSV column names, in order.
pub const CSV_HEADER: [&str; 3] = ["id", "name", "audience_size"];

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// File name used when the caller does not choose one.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "targeting.csv",
            ExportFormat::Json => "targeting.json",
        }
    }

    pub fn render(&self, items: &[TaxonomyItem]) -> Result<String> {
        match self {
            ExportFormat::Csv => to_csv(items),
            ExportFormat::Json => to_json(items),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => anyhow::bail!("Unknown export format: '{}'. Use csv or json.", other),
        }
    }
}

/// Render entries as CSV: a header row plus one row per entry, joined by
/// `\n` with no trailing newline.
pub fn to_csv(items: &[TaxonomyItem]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for item in items {
        let size = match item.audience_size {
            Some(size) => size.to_string(),
            None => format!("~{}", estimate_audience_size(&item.id)),
        };
        writer.write_record([item.id.as_str(), item.name.as_str(), size.as_str()])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
    let mut text = String::from_utf8(bytes).context("CSV output was not UTF-8")?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Render entries as pretty-printed JSON.
pub fn to_json(items: &[TaxonomyItem]) -> Result<String> {
    Ok(serde_json::to_string_pretty(items)?)
}

/// A destination for copied text (system clipboard, terminal, file…).
pub trait ClipboardSink {
    /// Short name for messages (e.g. `"pbcopy"`).
    fn name(&self) -> &str;
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Which sink accepted the copied text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Primary,
    Fallback,
}

/// Copy the entries as JSON text.
///
/// Tries `primary` first and silently falls back to `fallback` if it fails.
/// Either outcome counts as success; an error is returned only when both
/// sinks fail.
pub fn copy_to_clipboard(
    items: &[TaxonomyItem],
    primary: &dyn ClipboardSink,
    fallback: &dyn ClipboardSink,
) -> Result<CopyOutcome> {
    let text = to_json(items)?;
    if primary.write_text(&text).is_ok() {
        return Ok(CopyOutcome::Primary);
    }
    fallback
        .write_text(&text)
        .with_context(|| format!("Copy failed via {} and {}", primary.name(), fallback.name()))?;
    Ok(CopyOutcome::Fallback)
}
