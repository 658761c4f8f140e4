//! Byte-range edits over original source text.
//!
//! The planner emits [`Edit`]s against the file as parsed; [`SourceRewriter`]
//! validates them (bounds, character boundaries, overlap) and applies them in
//! reverse offset order so earlier edits never shift later ranges. Everything
//! outside an edited range survives byte-for-byte, which is what makes the
//! rewrite lossless for untouched code.

use thiserror::Error;

/// A single replacement of the half-open byte range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Start of the replaced range (inclusive).
    pub start: usize,
    /// End of the replaced range (exclusive).
    pub end: usize,
    /// Replacement text; empty for a deletion.
    pub replacement: String,
    /// Optional human-readable note shown in verbose previews.
    pub description: Option<String>,
}

impl Edit {
    /// Replace `[start, end)` with `replacement`.
    #[must_use]
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
            description: None,
        }
    }

    /// Delete `[start, end)`.
    #[must_use]
    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }

    /// Insert `text` at `offset` without removing anything.
    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset, offset, text)
    }

    /// Attach a description for verbose previews.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True if this edit's range intersects `other`'s.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Why a planned edit set was rejected.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Two planned edits intersect; applying both would corrupt the output.
    #[error("overlapping edits: [{a_start}, {a_end}) and [{b_start}, {b_end})")]
    OverlappingEdits {
        /// Start of the first edit.
        a_start: usize,
        /// End of the first edit.
        a_end: usize,
        /// Start of the second edit.
        b_start: usize,
        /// End of the second edit.
        b_end: usize,
    },
    /// An edit range extends past the end of the source.
    #[error("edit range [{start}, {end}) exceeds source length {source_len}")]
    OutOfBounds {
        /// Start of the offending edit.
        start: usize,
        /// End of the offending edit.
        end: usize,
        /// Length of the source being edited.
        source_len: usize,
    },
    /// An edit range is inverted or splits a multi-byte character.
    #[error("edit range [{start}, {end}) is not a valid character range")]
    InvalidRange {
        /// Start of the offending edit.
        start: usize,
        /// End of the offending edit.
        end: usize,
    },
}

/// Applies a set of non-overlapping byte-range edits to one source string.
#[derive(Debug)]
pub struct SourceRewriter {
    source: String,
    edits: Vec<Edit>,
}

impl SourceRewriter {
    /// Create a rewriter over `source` with no edits yet.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            edits: Vec::new(),
        }
    }

    /// Queue a single edit.
    pub fn add_edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Queue a batch of edits.
    pub fn add_edits(&mut self, edits: impl IntoIterator<Item = Edit>) {
        self.edits.extend(edits);
    }

    /// Number of queued edits.
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// True if any edit is queued.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Check bounds, character boundaries, and pairwise overlap.
    ///
    /// # Errors
    ///
    /// Returns the first [`RewriteError`] found.
    pub fn validate(&self) -> Result<(), RewriteError> {
        let len = self.source.len();
        for edit in &self.edits {
            if edit.start > edit.end
                || !self.source.is_char_boundary(edit.start.min(len))
                || !self.source.is_char_boundary(edit.end.min(len))
            {
                return Err(RewriteError::InvalidRange {
                    start: edit.start,
                    end: edit.end,
                });
            }
            if edit.end > len {
                return Err(RewriteError::OutOfBounds {
                    start: edit.start,
                    end: edit.end,
                    source_len: len,
                });
            }
        }

        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by_key(|e| (e.start, e.end));
        for pair in ordered.windows(2) {
            if pair[0].overlaps(pair[1]) {
                return Err(RewriteError::OverlappingEdits {
                    a_start: pair[0].start,
                    a_end: pair[0].end,
                    b_start: pair[1].start,
                    b_end: pair[1].end,
                });
            }
        }
        Ok(())
    }

    /// Validate and apply all edits, consuming the rewriter.
    ///
    /// Edits are applied back-to-front so byte offsets stay valid throughout.
    ///
    /// # Errors
    ///
    /// Returns a [`RewriteError`] if validation fails; the source is not
    /// modified in that case.
    pub fn apply(mut self) -> Result<String, RewriteError> {
        self.validate()?;
        // Stable sort: identical ranges keep planning order, so output is
        // deterministic.
        self.edits.sort_by(|a, b| b.start.cmp(&a.start));
        let mut result = self.source;
        for edit in &self.edits {
            result.replace_range(edit.start..edit.end, &edit.replacement);
        }
        Ok(result)
    }
}
