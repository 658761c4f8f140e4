//! The rewrite command: run a batch, report per-file outcomes, and
//! write the results in place when applying.

use anyhow::Result;
use colored::Colorize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::output;
use crate::processing::{run_batch, FileOutcome, FileStatus, RunSummary};
use crate::specializer::Specializer;
use crate::utils::validate_path_within_root;

/// Presentation and application options for one run.
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    /// Write files in place; otherwise dry run.
    pub apply: bool,
    /// Emit the JSON report instead of console lines.
    pub json: bool,
    /// Also report skipped and unchanged files.
    pub verbose: bool,
    /// No progress bar or summary table.
    pub quiet: bool,
    /// Extra folder names excluded from the walk.
    pub exclude_folders: Vec<String>,
}

/// Run the specializer over `roots` and report into `writer`.
///
/// Returns the final tally; a non-zero `failed` count is the caller's
/// cue for the exit code.
///
/// # Errors
///
/// Returns an error when reporting output cannot be written. Per-file
/// problems are tallied, not raised.
pub fn run_rewrite<W: Write>(
    specializer: &Specializer,
    roots: &[PathBuf],
    options: &RewriteOptions,
    writer: &mut W,
) -> Result<RunSummary> {
    let bar = output::create_progress_bar(options.quiet || options.json);
    let mut outcomes = run_batch(specializer, roots, &options.exclude_folders, Some(&bar));
    bar.finish_and_clear();

    if options.apply {
        write_outputs(&mut outcomes);
    }
    let summary = RunSummary::tally(&outcomes);

    if options.json {
        let report = output::json_report(
            specializer.spec().flag_name(),
            options.apply,
            &outcomes,
            summary,
        );
        output::print_json(writer, &report)?;
        return Ok(summary);
    }

    for outcome in &outcomes {
        match &outcome.status {
            FileStatus::Rewritten { passes, .. } => {
                if options.apply {
                    writeln!(
                        writer,
                        "{} {}",
                        "Rewrote:".green().bold(),
                        outcome.display_path
                    )?;
                } else {
                    writeln!(
                        writer,
                        "{} {}",
                        "[DRY-RUN] Would rewrite".yellow(),
                        outcome.display_path
                    )?;
                }
                if options.verbose {
                    writeln!(writer, "  converged after {passes} pass(es)")?;
                }
            }
            FileStatus::Failed(message) => {
                writeln!(
                    writer,
                    "{} {}: {message}",
                    "Failed:".red().bold(),
                    outcome.display_path
                )?;
            }
            FileStatus::Skipped(reason) if options.verbose => {
                writeln!(
                    writer,
                    "{} {} ({})",
                    "Skipped:".dimmed(),
                    outcome.display_path,
                    reason.as_str()
                )?;
            }
            FileStatus::Unchanged if options.verbose => {
                writeln!(writer, "{} {}", "Unchanged:".dimmed(), outcome.display_path)?;
            }
            FileStatus::Skipped(_) | FileStatus::Unchanged => {}
        }
    }

    if !options.quiet {
        writeln!(writer)?;
        output::print_summary(writer, &summary, options.apply)?;
    }
    Ok(summary)
}

/// Write every rewritten file back in place. A file that cannot be
/// validated or written flips to `Failed` so the tally reflects it.
fn write_outputs(outcomes: &mut [FileOutcome]) {
    for outcome in outcomes.iter_mut() {
        let failure = {
            let FileStatus::Rewritten { output, .. } = &outcome.status else {
                continue;
            };
            match validate_path_within_root(&outcome.path, &outcome.root) {
                Ok(path) => fs::write(&path, output)
                    .err()
                    .map(|err| format!("failed to write: {err}")),
                Err(err) => Some(format!("refusing to write: {err}")),
            }
        };
        if let Some(message) = failure {
            outcome.status = FileStatus::Failed(message);
        }
    }
}
