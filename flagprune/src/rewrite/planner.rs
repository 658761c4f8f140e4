//! One planning pass over a parsed module: find every construct that
//! observes the flag and emit the byte edits that specialize it.
//!
//! The planner resolves conditionals outermost-first. A resolved
//! conditional's kept arm is spliced as raw text and not revisited in the
//! same pass; constructs revealed by the splice are handled when the
//! driver reparses for the next pass. All edits of one pass are disjoint
//! by construction.

use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::{ExceptHandler, Expr, Stmt, StmtIf};
use ruff_text_size::Ranged;
use smallvec::SmallVec;

use crate::flag::FlagSpec;
use crate::matcher::{classify_test, AliasSet};
use crate::rewrite::edit::Edit;
use crate::rewrite::pruner::{self, PruneError};
use crate::utils::LineIndex;

/// Plan the edits for one pass over `suite` (a module body).
///
/// `aliases` is grown as imports are discovered and survives into later
/// passes. An empty result means the pass found nothing left to rewrite.
///
/// # Errors
///
/// Returns a [`PruneError`] when a declaration of the flag cannot be
/// sliced coherently; no edits are produced for the pass.
pub fn plan_pass(
    source: &str,
    index: &LineIndex,
    spec: &FlagSpec,
    aliases: &mut AliasSet,
    suite: &[Stmt],
) -> Result<Vec<Edit>, PruneError> {
    let mut planner = Planner {
        source,
        index,
        spec,
        edits: Vec::new(),
        truncating: false,
        error: None,
    };
    planner.visit_suite(suite, aliases, true);
    match planner.error {
        Some(err) => Err(err),
        None => Ok(planner.edits),
    }
}

struct Planner<'a> {
    source: &'a str,
    index: &'a LineIndex,
    spec: &'a FlagSpec,
    edits: Vec<Edit>,
    /// Truncation state of the current function scope. Saved and restored
    /// around function bodies; see [`Planner::visit_stmt`].
    truncating: bool,
    /// First declaration failure of the walk, fatal for the whole pass.
    error: Option<PruneError>,
}

impl Planner<'_> {
    fn visit_suite(&mut self, suite: &[Stmt], aliases: &mut AliasSet, module_level: bool) {
        // Everything below this offset is settled; truncation deletions
        // never reach back across it.
        let mut floor = 0;
        let sole = suite.len() == 1 && !module_level;
        for stmt in suite {
            let (start, end) = stmt_span(stmt);
            if self.truncating {
                if is_docstring_stmt(stmt) {
                    floor = self.index.line_end(end);
                    continue;
                }
                let edit = self.truncation_deletion(start, end, floor);
                floor = edit.end;
                self.edits.push(edit);
                continue;
            }
            self.visit_stmt(stmt, aliases, sole);
            floor = self.index.line_end(end);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt, aliases: &mut AliasSet, sole: bool) {
        match stmt {
            Stmt::If(stmt_if) => {
                match classify_test(self.spec, aliases, &stmt_if.test).evaluates_true() {
                    Some(value) => self.resolve_conditional(stmt_if, value, sole),
                    None => self.visit_unrelated_if(stmt_if, aliases),
                }
            }
            Stmt::FunctionDef(def) => {
                // The recursion stack is the scope stack: a fresh state for
                // the body, the caller's state back on exit.
                let saved = self.truncating;
                self.truncating = false;
                self.visit_suite(&def.body, aliases, false);
                self.truncating = saved;
            }
            Stmt::ClassDef(def) => self.visit_suite(&def.body, aliases, false),
            Stmt::With(with) => self.visit_suite(&with.body, aliases, false),
            Stmt::While(stmt_while) => {
                let suites: SmallVec<[&[Stmt]; 4]> =
                    SmallVec::from_slice(&[&stmt_while.body[..], &stmt_while.orelse[..]]);
                self.visit_parallel_suites(&suites, aliases);
            }
            Stmt::For(stmt_for) => {
                let suites: SmallVec<[&[Stmt]; 4]> =
                    SmallVec::from_slice(&[&stmt_for.body[..], &stmt_for.orelse[..]]);
                self.visit_parallel_suites(&suites, aliases);
            }
            Stmt::Try(stmt_try) => {
                let mut suites: SmallVec<[&[Stmt]; 4]> = SmallVec::new();
                suites.push(&stmt_try.body[..]);
                for handler in &stmt_try.handlers {
                    let ExceptHandler::ExceptHandler(h) = handler;
                    suites.push(&h.body[..]);
                }
                suites.push(&stmt_try.orelse[..]);
                suites.push(&stmt_try.finalbody[..]);
                self.visit_parallel_suites(&suites, aliases);
            }
            Stmt::Match(stmt_match) => {
                let suites: SmallVec<[&[Stmt]; 4]> = stmt_match
                    .cases
                    .iter()
                    .map(|case| &case.body[..])
                    .collect();
                self.visit_parallel_suites(&suites, aliases);
            }
            Stmt::Assign(assign) => {
                match pruner::prune_assign(self.source, self.index, aliases, assign) {
                    Ok(Some(edits)) => self.push_pruned(edits, stmt_span(stmt), sole),
                    Ok(None) => {}
                    Err(err) => {
                        if self.error.is_none() {
                            self.error = Some(err);
                        }
                    }
                }
            }
            Stmt::AnnAssign(ann) => {
                if let Some(edits) =
                    pruner::prune_ann_assign(self.source, self.index, aliases, ann)
                {
                    self.push_pruned(edits, stmt_span(stmt), sole);
                }
            }
            Stmt::Import(import) => {
                for alias in &import.names {
                    let binds_flag = alias
                        .name
                        .split('.')
                        .next_back()
                        .is_some_and(|last| last == self.spec.flag_name());
                    if binds_flag {
                        if let Some(asname) = &alias.asname {
                            aliases.record_alias(asname.as_str());
                        }
                    }
                }
                if let Some(edits) = pruner::prune_plain_import(
                    self.source,
                    self.index,
                    self.spec.flag_name(),
                    import,
                ) {
                    self.push_pruned(edits, stmt_span(stmt), sole);
                }
            }
            Stmt::ImportFrom(import) => {
                for alias in &import.names {
                    if alias.name.as_str() == self.spec.flag_name() {
                        if let Some(asname) = &alias.asname {
                            aliases.record_alias(asname.as_str());
                        }
                    }
                }
                if let Some(edits) = pruner::prune_from_import(
                    self.source,
                    self.index,
                    self.spec.flag_name(),
                    import,
                ) {
                    self.push_pruned(edits, stmt_span(stmt), sole);
                }
            }
            _ => {}
        }
    }

    /// Visit sibling suites that are alternatives of one compound
    /// statement. Each starts from the compound's entry state, so a
    /// truncating arm never deletes into the arms beside it; it does
    /// leave the whole compound truncating, and deletion resumes with
    /// the statements that follow it.
    fn visit_parallel_suites(&mut self, suites: &[&[Stmt]], aliases: &mut AliasSet) {
        let entry = self.truncating;
        let mut any_truncated = false;
        for suite in suites {
            self.truncating = entry;
            self.visit_suite(suite, aliases, false);
            any_truncated |= self.truncating;
        }
        self.truncating = entry || any_truncated;
    }

    /// Resolve a conditional whose own test observes the flag.
    fn resolve_conditional(&mut self, stmt_if: &StmtIf, test_true: bool, sole: bool) {
        let (start, end) = (
            stmt_if.range().start().to_usize(),
            stmt_if.range().end().to_usize(),
        );
        if test_true {
            let header_anchor = stmt_if.test.range().end().to_usize();
            self.splice_arm(start, end, &stmt_if.body, header_anchor);
            return;
        }
        match stmt_if.elif_else_clauses.split_first() {
            None => self.delete_statement_or_pass(start, end, sole),
            Some((clause, _)) if clause.test.is_some() => {
                // The elif chain takes over as its own conditional.
                let clause_start = clause.range().start().to_usize();
                self.edits.push(
                    Edit::delete(self.index.line_start(start), self.index.line_start(clause_start))
                        .with_description("drop disabled branch"),
                );
                self.edits
                    .push(Edit::replace(clause_start, clause_start + "elif".len(), "if"));
            }
            Some((else_clause, _)) => {
                let header_anchor = else_clause.range().start().to_usize();
                self.splice_arm(start, end, &else_clause.body, header_anchor);
            }
        }
    }

    /// Offset of the suite colon at or after `anchor` (the end of a
    /// clause's test, or the start of an `else` keyword). Any colon
    /// inside the test itself lies before its end; between the anchor
    /// and the header colon only whitespace, closing parens,
    /// continuations, and comments can appear, and a comment may carry
    /// a colon of its own, so the scan skips from `#` to end of line.
    fn colon_after(&self, anchor: usize) -> usize {
        let bytes = self.source.as_bytes();
        let mut pos = anchor;
        while pos < bytes.len() {
            match bytes[pos] {
                b':' => return pos,
                b'#' => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                }
                _ => pos += 1,
            }
        }
        anchor
    }

    /// Replace the whole conditional at `[start, end)` with the suite
    /// `body`, dedented to the conditional's own indentation. Sets the
    /// truncation state when the suite holds a top-level return.
    fn splice_arm(&mut self, start: usize, end: usize, body: &[Stmt], header_anchor: usize) {
        let (Some(first), Some(last)) = (body.first(), body.last()) else {
            return;
        };
        let stmt_line_start = self.index.line_start(start);
        let indent = &self.source[stmt_line_start..start];
        let first_start = first.range().start().to_usize();
        let last_end = last.range().end().to_usize();
        let header_line_end = self.index.line_end(self.colon_after(header_anchor));
        let body_region_end = self.index.line_end(last_end);
        let tail_end = self.index.line_end(end);

        if first_start < header_line_end {
            // Inline suite on the header line itself.
            let replacement = format!("{indent}{}", &self.source[first_start..body_region_end]);
            self.edits.push(
                Edit::replace(stmt_line_start, body_region_end, replacement)
                    .with_description("inline selected branch"),
            );
        } else {
            self.edits.push(
                Edit::delete(stmt_line_start, header_line_end)
                    .with_description("inline selected branch"),
            );
            let body_indent = &self.source[self.index.line_start(first_start)..first_start];
            let dedent = body_indent.len().saturating_sub(indent.len());
            if dedent > 0 {
                // A line starting inside a multi-line string token is
                // literal content, not indentation; reindenting it would
                // change the value the program computes.
                let literals = literal_ranges(body);
                let mut pos = header_line_end;
                while pos < body_region_end {
                    let line_end = self.index.line_end(pos);
                    let in_literal = literals.iter().any(|&(s, e)| s < pos && pos < e);
                    if !in_literal && self.source[pos..line_end].starts_with(body_indent) {
                        self.edits.push(Edit::delete(pos, pos + dedent));
                    }
                    pos = line_end;
                }
            }
        }
        if tail_end > body_region_end {
            self.edits.push(
                Edit::delete(body_region_end, tail_end).with_description("drop disabled branch"),
            );
        }
        if body.iter().any(|s| matches!(s, Stmt::Return(_))) {
            self.truncating = true;
        }
    }

    /// Resolve flag tests appearing in the elif clauses of a conditional
    /// whose primary test is unrelated, then recurse into the surviving
    /// arms.
    fn visit_unrelated_if(&mut self, stmt_if: &StmtIf, aliases: &mut AliasSet) {
        let mut arms: SmallVec<[&[Stmt]; 4]> = SmallVec::new();
        arms.push(&stmt_if.body[..]);
        let clauses = &stmt_if.elif_else_clauses;
        for (i, clause) in clauses.iter().enumerate() {
            let Some(test) = &clause.test else {
                arms.push(&clause.body[..]);
                continue;
            };
            match classify_test(self.spec, aliases, test).evaluates_true() {
                Some(true) => {
                    // This clause always runs once reached: it becomes the
                    // else, and everything after it is unreachable.
                    let clause_start = clause.range().start().to_usize();
                    let header_end = self.colon_after(test.range().end().to_usize());
                    self.edits.push(
                        Edit::replace(clause_start, header_end, "else")
                            .with_description("inline selected branch"),
                    );
                    arms.push(&clause.body[..]);
                    if let Some(next) = clauses.get(i + 1) {
                        let last = &clauses[clauses.len() - 1];
                        self.edits.push(
                            Edit::delete(
                                self.index.line_start(next.range().start().to_usize()),
                                self.index.line_end(last.range().end().to_usize()),
                            )
                            .with_description("drop disabled branch"),
                        );
                    }
                    break;
                }
                Some(false) => {
                    let clause_start = clause.range().start().to_usize();
                    let clause_end = clause.range().end().to_usize();
                    self.edits.push(
                        Edit::delete(
                            self.index.line_start(clause_start),
                            self.index.line_end(clause_end),
                        )
                        .with_description("drop disabled branch"),
                    );
                }
                None => arms.push(&clause.body[..]),
            }
        }
        self.visit_parallel_suites(&arms, aliases);
    }

    /// Append pruner edits, downgrading a whole-statement removal to a
    /// `pass` replacement when the statement is the only one in a
    /// non-module suite.
    fn push_pruned(&mut self, edits: Vec<Edit>, span: (usize, usize), sole: bool) {
        let (start, end) = span;
        if sole {
            let line_start = self.index.line_start(start);
            let line_end = self.index.line_end(end);
            if let [only] = edits.as_slice() {
                if only.replacement.is_empty() && only.start == line_start && only.end == line_end {
                    self.delete_statement_or_pass(start, end, true);
                    return;
                }
            }
        }
        self.edits.extend(edits);
    }

    /// Remove one statement; the sole statement of a suite is replaced by
    /// `pass` so the suite stays non-empty.
    fn delete_statement_or_pass(&mut self, start: usize, end: usize, sole: bool) {
        if sole {
            let line_start = self.index.line_start(start);
            let line_end = self.index.line_end(end);
            let indent = &self.source[line_start..start];
            self.edits.push(
                Edit::replace(line_start, line_end, format!("{indent}pass\n"))
                    .with_description("drop disabled branch"),
            );
        } else {
            self.edits.push(
                pruner::statement_deletion(self.source, self.index, start, end)
                    .with_description("drop disabled branch"),
            );
        }
    }

    /// Deletion for a statement proven unreachable, extended upward over
    /// the blank and comment lines that introduce it, but never past
    /// `floor`.
    fn truncation_deletion(&self, start: usize, end: usize, floor: usize) -> Edit {
        let mut from = self.index.line_start(start);
        while from > floor {
            let Some(prev) = self.index.prev_line_start(from) else {
                break;
            };
            if prev < floor {
                break;
            }
            let line = self.source[prev..from].trim();
            if line.is_empty() || line.starts_with('#') {
                from = prev;
            } else {
                break;
            }
        }
        Edit::delete(from, self.index.line_end(end)).with_description("remove unreachable statement")
    }
}

fn stmt_span(stmt: &Stmt) -> (usize, usize) {
    (
        stmt.range().start().to_usize(),
        stmt.range().end().to_usize(),
    )
}

/// A standalone string-literal statement, conventionally documentation.
/// Never treated as a flag block and never truncated.
fn is_docstring_stmt(stmt: &Stmt) -> bool {
    matches!(stmt, Stmt::Expr(expr) if matches!(&*expr.value, Expr::StringLiteral(_)))
}

/// Byte ranges of string, bytes, and f-string literals anywhere under
/// `suite`, nested statements included.
fn literal_ranges(suite: &[Stmt]) -> Vec<(usize, usize)> {
    let mut finder = LiteralFinder(Vec::new());
    for stmt in suite {
        finder.visit_stmt(stmt);
    }
    finder.0
}

struct LiteralFinder(Vec<(usize, usize)>);

impl<'a> Visitor<'a> for LiteralFinder {
    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::StringLiteral(_) | Expr::BytesLiteral(_) | Expr::FString(_) => {
                let range = expr.range();
                self.0
                    .push((range.start().to_usize(), range.end().to_usize()));
            }
            _ => visitor::walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{FlagSpec, Polarity};
    use crate::rewrite::edit::SourceRewriter;

    /// Parse, plan one pass, and apply it.
    fn rewrite_once(source: &str, spec: &FlagSpec) -> String {
        let mut aliases = AliasSet::for_flag(spec);
        rewrite_once_with(source, spec, &mut aliases)
    }

    fn rewrite_once_with(source: &str, spec: &FlagSpec, aliases: &mut AliasSet) -> String {
        let module = ruff_python_parser::parse_module(source)
            .expect("test source should parse")
            .into_syntax();
        let index = LineIndex::new(source);
        let edits =
            plan_pass(source, &index, spec, aliases, &module.body).expect("pass should plan");
        let mut rewriter = SourceRewriter::new(source);
        rewriter.add_edits(edits);
        rewriter.apply().expect("planned edits should apply")
    }

    fn bare() -> FlagSpec {
        FlagSpec::bare("FLAG").unwrap()
    }

    #[test]
    fn enabled_branch_is_spliced_and_dedented() {
        let source = "\
def handler():
    if FLAG:
        setup()
        return finish()
    legacy()
";
        let expected = "\
def handler():
    setup()
    return finish()
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn disabled_branch_keeps_the_else_arm() {
        let source = "\
if not FLAG:
    new_path()
else:
    old_path()
";
        assert_eq!(rewrite_once(source, &bare()), "old_path()\n");
    }

    #[test]
    fn disabled_conditional_without_else_disappears() {
        let source = "\
before()
if FLAG:
    gone()
after()
";
        let spec = bare().with_polarity(Polarity::Control);
        assert_eq!(rewrite_once(source, &spec), "before()\nafter()\n");
    }

    #[test]
    fn sole_conditional_leaves_a_pass_behind() {
        let source = "\
def noop():
    if FLAG:
        gone()
";
        let spec = bare().with_polarity(Polarity::Control);
        assert_eq!(rewrite_once(source, &spec), "def noop():\n    pass\n");
    }

    #[test]
    fn inline_suite_is_inlined_on_one_line() {
        let source = "\
def f():
    if FLAG: return quick()
    slow()
";
        let expected = "\
def f():
    return quick()
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn interior_comments_travel_with_the_spliced_body() {
        let source = "\
if FLAG:
    # keep this note
    act()
";
        assert_eq!(rewrite_once(source, &bare()), "# keep this note\nact()\n");
    }

    #[test]
    fn multiline_string_values_are_not_dedented() {
        let source = "\
if FLAG:
    s = \"\"\"
    first
    \"\"\"
    send(s)
";
        let expected = "\
s = \"\"\"
    first
    \"\"\"
send(s)
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn truncation_takes_leading_comments_and_blanks() {
        let source = "\
def f():
    if FLAG:
        return 1

    # dead below
    cleanup()
";
        assert_eq!(rewrite_once(source, &bare()), "def f():\n    return 1\n");
    }

    #[test]
    fn truncation_stops_at_the_function_boundary() {
        let source = "\
def f():
    if FLAG:
        return 1
    dead()

def g():
    live()
";
        let expected = "\
def f():
    return 1

def g():
    live()
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn docstrings_survive_truncation() {
        let source = "\
def f():
    \"\"\"Docs stay.\"\"\"
    if FLAG:
        return 1
    dead()
";
        let expected = "\
def f():
    \"\"\"Docs stay.\"\"\"
    return 1
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn truncation_continues_past_an_enclosing_loop() {
        let source = "\
def f(xs):
    for x in xs:
        if FLAG:
            return x
    fallback()
";
        let expected = "\
def f(xs):
    for x in xs:
        return x
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn false_primary_promotes_the_elif_chain() {
        let source = "\
if FLAG:
    a()
elif other:
    b()
else:
    c()
";
        let spec = bare().with_polarity(Polarity::Control);
        let expected = "\
if other:
    b()
else:
    c()
";
        assert_eq!(rewrite_once(source, &spec), expected);
    }

    #[test]
    fn true_elif_clause_becomes_the_else() {
        let source = "\
if other:
    a()
elif FLAG:
    b()
elif late:
    c()
";
        let expected = "\
if other:
    a()
else:
    b()
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn false_elif_clause_is_dropped() {
        let source = "\
if other:
    a()
elif FLAG:
    b()
else:
    c()
";
        let spec = bare().with_polarity(Polarity::Control);
        let expected = "\
if other:
    a()
else:
    c()
";
        assert_eq!(rewrite_once(source, &spec), expected);
    }

    #[test]
    fn unrelated_conditionals_are_untouched() {
        let source = "\
if check(FLAG, fallback):
    touched()
else:
    alone()
";
        assert_eq!(rewrite_once(source, &bare()), source);
    }

    #[test]
    fn compound_tests_are_untouched() {
        let source = "if FLAG and ready:\n    mixed()\n";
        assert_eq!(rewrite_once(source, &bare()), source);
    }

    #[test]
    fn conditional_inside_unrelated_arms_is_resolved() {
        let source = "\
def f():
    if mode:
        if FLAG:
            return 1
        skipped()
    else:
        kept()
";
        let expected = "\
def f():
    if mode:
        return 1
    else:
        kept()
";
        assert_eq!(rewrite_once(source, &bare()), expected);
    }

    #[test]
    fn import_alias_resolves_within_the_same_pass() {
        let spec = FlagSpec::with_resolver("FLAG", "is_active").unwrap();
        let source = "\
from mod.flags import FLAG as F

def f():
    if is_active(F):
        return 0
    return 1
";
        let expected = "\ndef f():\n    return 0\n";
        let mut aliases = AliasSet::for_flag(&spec);
        assert_eq!(rewrite_once_with(source, &spec, &mut aliases), expected);
        assert!(aliases.resolves("F"));
    }

    #[test]
    fn nested_flag_blocks_need_a_second_pass() {
        let source = "\
if FLAG:
    if not FLAG:
        dead()
    live()
";
        let spec = bare();
        let mut aliases = AliasSet::for_flag(&spec);
        let once = rewrite_once_with(source, &spec, &mut aliases);
        assert_eq!(once, "if not FLAG:\n    dead()\nlive()\n");
        let twice = rewrite_once_with(&once, &spec, &mut aliases);
        assert_eq!(twice, "live()\n");
    }

    #[test]
    fn declarations_are_pruned_during_the_walk() {
        let source = "\
FLAG = True
a, FLAG, b = 1, 2, 3
use(a, b)
";
        assert_eq!(rewrite_once(source, &bare()), "a, b = 1, 3\nuse(a, b)\n");
    }

    #[test]
    fn parenthesized_multi_line_test_is_spliced_whole() {
        let source = "\
if (
    FLAG
):
    act()
else:
    other()
";
        assert_eq!(rewrite_once(source, &bare()), "act()\n");
    }

    #[test]
    fn header_comment_colons_do_not_end_the_header() {
        let source = "\
if (
    FLAG  # see: notes
):
    act()
else:
    other()
";
        assert_eq!(rewrite_once(source, &bare()), "act()\n");
    }

    #[test]
    fn arity_mismatch_fails_the_pass() {
        let source = "a, FLAG = 1, 2, 3\n";
        let module = ruff_python_parser::parse_module(source)
            .expect("test source should parse")
            .into_syntax();
        let index = LineIndex::new(source);
        let spec = bare();
        let mut aliases = AliasSet::for_flag(&spec);
        let result = plan_pass(source, &index, &spec, &mut aliases, &module.body);
        assert!(matches!(
            result,
            Err(PruneError::TupleArityMismatch { .. })
        ));
    }
}
