//! Removal of flag declarations: assignments, annotated assignments, and
//! import entries.
//!
//! Multi-part statements are sliced rather than deleted. A chained or
//! tuple assignment loses only the flag's own slot, and an import loses
//! only the flag's entry; the whole statement goes only when nothing else
//! would remain of it.

use ruff_python_ast::{Expr, StmtAnnAssign, StmtAssign, StmtImport, StmtImportFrom};
use ruff_text_size::Ranged;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::matcher::{is_flag_reference, AliasSet};
use crate::rewrite::edit::Edit;
use crate::utils::LineIndex;

/// A flag declaration that cannot be sliced coherently.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PruneError {
    /// A tuple assignment declares the flag but unpacks a sequence of a
    /// different length, so no value element can be paired with it.
    #[error("tuple assignment unpacks {targets} names from {values} values")]
    TupleArityMismatch {
        /// Number of names on the target side.
        targets: usize,
        /// Number of elements on the value side.
        values: usize,
    },
}

/// Edit that removes one whole statement.
///
/// A statement alone on its line(s) is removed line-inclusive, taking any
/// trailing comment with it. A statement sharing its line goes together
/// with one adjacent semicolon separator. The sole statement of an inline
/// suite (`if x: FLAG = 1`) is replaced by `pass` to keep the suite
/// non-empty.
#[must_use]
pub fn statement_deletion(source: &str, index: &LineIndex, start: usize, end: usize) -> Edit {
    let line_start = index.line_start(start);
    let line_end = index.line_end(end);
    let before = &source[line_start..start];
    let after = &source[end..line_end];
    let tail_is_blank = {
        let trimmed = after.trim();
        trimmed.is_empty() || trimmed.starts_with('#')
    };

    if before.trim().is_empty() && tail_is_blank {
        return Edit::delete(line_start, line_end);
    }
    if before.trim_end().ends_with(':') && tail_is_blank {
        return Edit::replace(start, end, "pass");
    }
    if let Some(semi) = after.find(';') {
        if after[..semi].trim().is_empty() {
            let mut ext = end + semi + 1;
            while source[ext..line_end]
                .chars()
                .next()
                .is_some_and(|c| c == ' ' || c == '\t')
            {
                ext += 1;
            }
            return Edit::delete(start, ext);
        }
    }
    if let Some(semi) = before.rfind(';') {
        if before[semi + 1..].trim().is_empty() {
            return Edit::delete(line_start + semi, end);
        }
    }
    Edit::delete(start, end)
}

/// Edits that remove the flag from an assignment. `Ok(None)` means the
/// statement does not declare the flag, or declares it through a form
/// that cannot be sliced (starred unpacking, an opaque value); such
/// statements stay as they are.
///
/// # Errors
///
/// Returns [`PruneError::TupleArityMismatch`] when the flag sits in a
/// tuple target whose value side is a sequence of a different length:
/// removing either side alone would change what the statement assigns.
pub fn prune_assign(
    source: &str,
    index: &LineIndex,
    aliases: &AliasSet,
    assign: &StmtAssign,
) -> Result<Option<Vec<Edit>>, PruneError> {
    let start = assign.range().start().to_usize();
    let end = assign.range().end().to_usize();

    if let [target] = assign.targets.as_slice() {
        if is_flag_reference(aliases, target) {
            return Ok(Some(vec![statement_deletion(source, index, start, end)
                .with_description("remove flag assignment")]));
        }
        let Some(target_elts) = sequence_elements(target) else {
            return Ok(None);
        };
        let remove = flag_element_indices(aliases, target_elts);
        if remove.is_empty() {
            return Ok(None);
        }
        if remove.len() == target_elts.len() {
            return Ok(Some(vec![statement_deletion(source, index, start, end)
                .with_description("remove flag assignment")]));
        }
        // Slicing needs a value element to pair with each target name.
        // An opaque value (a call, a name) stays as it is; a sequence of
        // the wrong length is malformed input.
        let Some(value_elts) = sequence_elements(&assign.value) else {
            return Ok(None);
        };
        if value_elts.len() != target_elts.len() {
            return Err(PruneError::TupleArityMismatch {
                targets: target_elts.len(),
                values: value_elts.len(),
            });
        }
        let mut edits = removal_edits(&element_ranges(target_elts), &remove);
        edits.extend(removal_edits(&element_ranges(value_elts), &remove));
        return Ok(Some(edits));
    }

    // Chained assignment: drop only the flag's own targets.
    let remove: FxHashSet<usize> = assign
        .targets
        .iter()
        .enumerate()
        .filter(|(_, t)| is_flag_reference(aliases, t))
        .map(|(i, _)| i)
        .collect();
    if remove.is_empty() {
        return Ok(None);
    }
    if remove.len() == assign.targets.len() {
        return Ok(Some(vec![statement_deletion(source, index, start, end)
            .with_description("remove flag assignment")]));
    }
    // The value acts as the trailing anchor, so every removed target run
    // has a following element to delete up to.
    let mut ranges = element_ranges(&assign.targets);
    ranges.push((
        assign.value.range().start().to_usize(),
        assign.value.range().end().to_usize(),
    ));
    Ok(Some(removal_edits(&ranges, &remove)))
}

/// Edit that removes an annotated declaration of the flag (`FLAG: bool`
/// with or without a value), or `None` for any other target.
#[must_use]
pub fn prune_ann_assign(
    source: &str,
    index: &LineIndex,
    aliases: &AliasSet,
    ann: &StmtAnnAssign,
) -> Option<Vec<Edit>> {
    if !is_flag_reference(aliases, &ann.target) {
        return None;
    }
    let start = ann.range().start().to_usize();
    let end = ann.range().end().to_usize();
    Some(vec![statement_deletion(source, index, start, end)
        .with_description("remove flag declaration")])
}

/// Edits that remove the flag's entries from a `from ... import ...`
/// statement, or `None` when no entry imports the flag.
///
/// Entries match on the flag's original name, never on a local alias; a
/// later `from elsewhere import F` binds an unrelated `F` and stays.
#[must_use]
pub fn prune_from_import(
    source: &str,
    index: &LineIndex,
    flag_name: &str,
    import: &StmtImportFrom,
) -> Option<Vec<Edit>> {
    let remove: FxHashSet<usize> = import
        .names
        .iter()
        .enumerate()
        .filter(|(_, alias)| alias.name.as_str() == flag_name)
        .map(|(i, _)| i)
        .collect();
    prune_entries(
        source,
        index,
        import.range().start().to_usize(),
        import.range().end().to_usize(),
        &import.names,
        &remove,
    )
}

/// Edits that remove the flag's entries from a plain `import` statement,
/// or `None` when no entry imports the flag.
///
/// Only the aliased form binds the flag object to a plain name
/// (`import features.FLAG as F`); `import FLAG` binds a module and is
/// left alone.
#[must_use]
pub fn prune_plain_import(
    source: &str,
    index: &LineIndex,
    flag_name: &str,
    import: &StmtImport,
) -> Option<Vec<Edit>> {
    let remove: FxHashSet<usize> = import
        .names
        .iter()
        .enumerate()
        .filter(|(_, alias)| {
            alias.asname.is_some()
                && alias
                    .name
                    .split('.')
                    .next_back()
                    .is_some_and(|last| last == flag_name)
        })
        .map(|(i, _)| i)
        .collect();
    prune_entries(
        source,
        index,
        import.range().start().to_usize(),
        import.range().end().to_usize(),
        &import.names,
        &remove,
    )
}

fn prune_entries(
    source: &str,
    index: &LineIndex,
    stmt_start: usize,
    stmt_end: usize,
    names: &[ruff_python_ast::Alias],
    remove: &FxHashSet<usize>,
) -> Option<Vec<Edit>> {
    if remove.is_empty() {
        return None;
    }
    if remove.len() == names.len() {
        return Some(vec![statement_deletion(source, index, stmt_start, stmt_end)
            .with_description("remove flag import")]);
    }
    let ranges: Vec<(usize, usize)> = names
        .iter()
        .map(|alias| {
            (
                alias.range().start().to_usize(),
                alias.range().end().to_usize(),
            )
        })
        .collect();
    Some(removal_edits(&ranges, remove))
}

/// Elements of a tuple or list expression, or `None` for anything else
/// (including sequences containing starred elements, which do not unpack
/// one-to-one).
fn sequence_elements(expr: &Expr) -> Option<&[Expr]> {
    let elts: &[Expr] = match expr {
        Expr::Tuple(tuple) => &tuple.elts,
        Expr::List(list) => &list.elts,
        _ => return None,
    };
    if elts.iter().any(|e| matches!(e, Expr::Starred(_))) {
        return None;
    }
    Some(elts)
}

fn flag_element_indices(aliases: &AliasSet, elements: &[Expr]) -> FxHashSet<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, e)| is_flag_reference(aliases, e))
        .map(|(i, _)| i)
        .collect()
}

fn element_ranges(elements: &[Expr]) -> Vec<(usize, usize)> {
    elements
        .iter()
        .map(|e| (e.range().start().to_usize(), e.range().end().to_usize()))
        .collect()
}

/// Comma-aware deletions for removed elements of a separated list.
///
/// Each contiguous run of removed elements becomes one edit: up to the
/// next kept element's start, or (for a run ending the list) back from
/// the previous kept element's end. The caller guarantees at least one
/// element is kept.
fn removal_edits(ranges: &[(usize, usize)], remove: &FxHashSet<usize>) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut i = 0;
    while i < ranges.len() {
        if !remove.contains(&i) {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < ranges.len() && remove.contains(&i) {
            i += 1;
        }
        let edit = if i < ranges.len() {
            Edit::delete(ranges[run_start].0, ranges[i].0)
        } else {
            Edit::delete(ranges[run_start - 1].1, ranges[ranges.len() - 1].1)
        };
        edits.push(edit.with_description("remove flag entry"));
    }
    edits
}
