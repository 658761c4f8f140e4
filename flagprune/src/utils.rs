//! Shared helpers: line indexing over source text, file collection, and
//! path display/containment utilities.

use crate::constants::DEFAULT_EXCLUDE_FOLDERS;
use std::path::{Path, PathBuf};

/// Byte-offset line index over one source file.
///
/// Built once per file and consulted by the edit planner, which works in
/// whole-line units (statement deletion, splice regions, dedenting).
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the first character of each line, starting with 0.
    line_starts: Vec<usize>,
    /// Total source length in bytes.
    len: usize,
}

impl LineIndex {
    /// Build the index for `source`.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Index (0-based) of the line containing `offset`.
    fn line_number(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        }
    }

    /// Byte offset of the first character of the line containing `offset`.
    #[must_use]
    pub fn line_start(&self, offset: usize) -> usize {
        self.line_starts[self.line_number(offset.min(self.len))]
    }

    /// Byte offset one past the line containing `offset`: just after its
    /// terminator, or the end of the source for the final line.
    #[must_use]
    pub fn line_end(&self, offset: usize) -> usize {
        let line = self.line_number(offset.min(self.len));
        self.line_starts.get(line + 1).copied().unwrap_or(self.len)
    }

    /// Byte offset of the line preceding the one containing `offset`, if any.
    #[must_use]
    pub fn prev_line_start(&self, offset: usize) -> Option<usize> {
        let line = self.line_number(offset.min(self.len));
        line.checked_sub(1).map(|prev| self.line_starts[prev])
    }
}

/// True if `name` matches any exclusion entry (exact, or `*.suffix` glob).
#[must_use]
pub fn is_excluded(name: &str, excludes: &[String]) -> bool {
    for exclude in excludes {
        if exclude.starts_with("*.") {
            if name.ends_with(&exclude[1..]) {
                return true;
            }
        } else if name == exclude {
            return true;
        }
    }
    false
}

/// Collect `.py` files under `root`, honoring gitignore rules and skipping
/// excluded directories at traversal time.
#[must_use]
pub fn collect_python_files(root: &Path, exclude: &[String]) -> Vec<PathBuf> {
    use ignore::WalkBuilder;

    // Merge user excludes with the defaults
    let default_excludes: Vec<String> = DEFAULT_EXCLUDE_FOLDERS()
        .iter()
        .map(|&s| s.to_owned())
        .collect();
    let all_excludes: Vec<String> = exclude.iter().cloned().chain(default_excludes).collect();

    let excludes_for_filter = all_excludes.clone();
    let root_for_filter = root.to_path_buf();

    // filter_entry prunes excluded directories before descent, so large
    // vendored trees (.venv, node_modules, ...) are never walked.
    let walker = WalkBuilder::new(root)
        .hidden(false) // Don't skip hidden files (we handle that with defaults)
        .git_ignore(true) // Respect .gitignore files
        .git_global(true) // Respect global gitignore
        .git_exclude(true) // Respect .git/info/exclude
        .filter_entry(move |entry| {
            if entry.path() == root_for_filter {
                return true;
            }
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_excluded(name, &excludes_for_filter) {
                    return false;
                }
            }
            true
        })
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "py") {
            files.push(path.to_path_buf());
        }
    }
    files
}

/// Normalize a path for display: relative to the current directory where
/// possible, without a leading `./`.
#[must_use]
pub fn normalize_display_path(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf));
    let shown = relative.as_deref().unwrap_or(path);
    let shown = shown.strip_prefix("./").unwrap_or(shown);
    shown.display().to_string()
}

/// Validates that `path` lies within `root` after canonicalization.
///
/// Files are only ever written back in place; this guards the write path
/// against symlinks pointing outside the scanned tree.
///
/// # Errors
///
/// Returns an error if either path cannot be canonicalized or if `path`
/// escapes `root`.
pub fn validate_path_within_root(path: &Path, root: &Path) -> anyhow::Result<PathBuf> {
    let canonical_path = path
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("cannot resolve {}: {e}", path.display()))?;
    let canonical_root = root
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("cannot resolve {}: {e}", root.display()))?;
    if !canonical_path.starts_with(&canonical_root) {
        anyhow::bail!(
            "refusing to write outside the scanned tree: {}",
            path.display()
        );
    }
    Ok(canonical_path)
}
