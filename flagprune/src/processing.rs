//! Batch processing: walk the scan roots, specialize every Python file,
//! and collect per-file outcomes.
//!
//! Files are independent, so the batch is processed in parallel chunks.
//! Nothing here touches the filesystem beyond reading; applying rewrites
//! to disk is the command layer's decision.

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::gate::module_identity;
use crate::specializer::{SkipReason, SpecializeOutcome, Specializer};
use crate::utils::{collect_python_files, normalize_display_path};

/// Files processed per parallel work unit.
pub const CHUNK_SIZE: usize = 500;

/// Terminal state of one file after a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Gated out before parsing.
    Skipped(SkipReason),
    /// Visited, nothing to rewrite.
    Unchanged,
    /// Rewritten; `output` holds the replacement contents.
    Rewritten {
        /// Full new file contents.
        output: String,
        /// Passes to convergence.
        passes: usize,
    },
    /// Read, parse, or rewrite failure; the file is left untouched.
    Failed(String),
}

impl FileStatus {
    /// Stable label used in reports.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped(_) => "skipped",
            Self::Unchanged => "unchanged",
            Self::Rewritten { .. } => "rewritten",
            Self::Failed(_) => "failed",
        }
    }
}

/// One file's result, with the paths needed to report and apply it.
#[derive(Debug)]
pub struct FileOutcome {
    /// Absolute or as-collected path, used for writing.
    pub path: PathBuf,
    /// The scan root this file was collected under.
    pub root: PathBuf,
    /// Path relative to the working directory, used for display.
    pub display_path: String,
    /// Dotted module identity, when one could be derived.
    pub module: Option<String>,
    /// Terminal state after specialization.
    pub status: FileStatus,
}

/// Aggregate counts over a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files collected under the scan roots.
    pub scanned: usize,
    /// Files gated out before parsing.
    pub skipped: usize,
    /// Files visited without any rewrite.
    pub unchanged: usize,
    /// Files with at least one rewrite.
    pub rewritten: usize,
    /// Files that could not be read, parsed, or rewritten.
    pub failed: usize,
}

impl RunSummary {
    #[must_use]
    pub fn tally(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self {
            scanned: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.status {
                FileStatus::Skipped(_) => summary.skipped += 1,
                FileStatus::Unchanged => summary.unchanged += 1,
                FileStatus::Rewritten { .. } => summary.rewritten += 1,
                FileStatus::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Specialize every Python file under the given roots.
///
/// A root may be a directory (walked with the exclusion rules) or a
/// single file. Outcomes come back sorted by display path regardless of
/// which worker finished first.
#[must_use]
pub fn run_batch(
    specializer: &Specializer,
    roots: &[PathBuf],
    exclude_folders: &[String],
    progress: Option<&ProgressBar>,
) -> Vec<FileOutcome> {
    let mut work: Vec<(PathBuf, PathBuf)> = Vec::new();
    for root in roots {
        if root.is_file() {
            let base = root.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            work.push((base, root.clone()));
        } else {
            for file in collect_python_files(root, exclude_folders) {
                work.push((root.clone(), file));
            }
        }
    }
    if let Some(bar) = progress {
        bar.set_length(work.len() as u64);
    }

    let mut outcomes: Vec<FileOutcome> = work
        .par_chunks(CHUNK_SIZE)
        .flat_map(|chunk| {
            chunk
                .iter()
                .map(|(root, path)| {
                    let outcome = process_file(specializer, root, path);
                    if let Some(bar) = progress {
                        bar.inc(1);
                    }
                    outcome
                })
                .collect::<Vec<_>>()
        })
        .collect();
    outcomes.sort_by(|a, b| a.display_path.cmp(&b.display_path));
    outcomes
}

fn process_file(specializer: &Specializer, root: &Path, path: &Path) -> FileOutcome {
    let display_path = normalize_display_path(path);
    let module = module_identity(root, path);
    let status = match fs::read_to_string(path) {
        Ok(source) => match specializer.specialize_module(module.as_deref(), &source) {
            Ok(SpecializeOutcome::Skipped(reason)) => FileStatus::Skipped(reason),
            Ok(SpecializeOutcome::Unchanged) => FileStatus::Unchanged,
            Ok(SpecializeOutcome::Rewritten { output, passes }) => {
                FileStatus::Rewritten { output, passes }
            }
            Err(err) => FileStatus::Failed(err.to_string()),
        },
        Err(err) => FileStatus::Failed(format!("failed to read: {err}")),
    };
    FileOutcome {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
        display_path,
        module,
        status,
    }
}
