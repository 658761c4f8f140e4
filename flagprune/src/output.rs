//! Console and JSON reporting for batch runs.

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::Write;

use crate::processing::{FileOutcome, FileStatus, RunSummary};

/// Progress bar for a batch of files; hidden when quiet and in tests.
#[must_use]
pub fn create_progress_bar(quiet: bool) -> ProgressBar {
    if quiet || cfg!(test) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} files ({elapsed})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=>-");
    bar.set_style(style);
    bar
}

/// One file entry of the JSON report.
#[derive(Debug, Serialize)]
pub struct JsonFile<'a> {
    /// Display path of the file.
    pub path: &'a str,
    /// Status label: `skipped`, `unchanged`, `rewritten`, or `failed`.
    pub status: &'static str,
    /// Dotted module identity, when derivable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<&'a str>,
    /// Skip reason or failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
    /// Passes to convergence for rewritten files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes: Option<usize>,
}

/// Machine-readable run report.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Flag name the run specialized for.
    pub flag: &'a str,
    /// `apply` or `dry-run`.
    pub mode: &'static str,
    /// Aggregate counts.
    pub summary: RunSummary,
    /// Per-file entries, sorted by display path.
    pub files: Vec<JsonFile<'a>>,
}

/// Assemble the JSON report for a finished batch.
#[must_use]
pub fn json_report<'a>(
    flag: &'a str,
    apply: bool,
    outcomes: &'a [FileOutcome],
    summary: RunSummary,
) -> JsonReport<'a> {
    let files = outcomes
        .iter()
        .map(|outcome| {
            let (reason, passes) = match &outcome.status {
                FileStatus::Skipped(reason) => (Some(reason.as_str()), None),
                FileStatus::Failed(message) => (Some(message.as_str()), None),
                FileStatus::Rewritten { passes, .. } => (None, Some(*passes)),
                FileStatus::Unchanged => (None, None),
            };
            JsonFile {
                path: &outcome.display_path,
                status: outcome.status.label(),
                module: outcome.module.as_deref(),
                reason,
                passes,
            }
        })
        .collect();
    JsonReport {
        flag,
        mode: if apply { "apply" } else { "dry-run" },
        summary,
        files,
    }
}

/// Write the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error when serialization or the underlying write fails.
pub fn print_json<W: Write>(writer: &mut W, report: &JsonReport<'_>) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

/// Render the closing summary table.
///
/// # Errors
///
/// Returns an error when the underlying write fails.
pub fn print_summary<W: Write>(
    writer: &mut W,
    summary: &RunSummary,
    apply: bool,
) -> anyhow::Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Outcome", "Files"]);
    let rewritten_label = if apply { "Rewritten" } else { "Would rewrite" };
    for (label, count) in [
        ("Scanned", summary.scanned),
        ("Skipped", summary.skipped),
        ("Unchanged", summary.unchanged),
        (rewritten_label, summary.rewritten),
        ("Failed", summary.failed),
    ] {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    writeln!(writer, "{table}")?;
    Ok(())
}
