//! Per-file driver: repeated plan/apply passes until a fixpoint.
//!
//! Each pass parses the current text, plans the outermost rewrites, and
//! applies them; constructs revealed by a splice are picked up by the
//! next pass. Every applied result is reparsed before the next plan, so
//! a rewrite that would break the file's syntax is caught here and not
//! written anywhere.

use serde::Serialize;
use thiserror::Error;

use crate::flag::FlagSpec;
use crate::gate::{GateDecision, ModuleGate};
use crate::matcher::AliasSet;
use crate::rewrite::{plan_pass, PruneError, RewriteError, SourceRewriter};
use crate::utils::LineIndex;

/// Upper bound on plan/apply passes per file. Each pass eliminates at
/// least one construct, so hitting this means pathological nesting or a
/// planner bug; either way the file is failed rather than looped on.
pub const MAX_REWRITE_PASSES: usize = 16;

/// A failure to specialize one file. Other files are unaffected.
#[derive(Debug, Error)]
pub enum SpecializeError {
    /// The input was not parseable Python.
    #[error("syntax error: {message}")]
    Parse {
        /// Parser diagnostic, including the location.
        message: String,
    },
    /// A rewrite pass produced text that no longer parses. The original
    /// file is left untouched.
    #[error("rewrite pass {pass} produced invalid syntax: {message}")]
    ReparseFailed {
        /// Pass number that produced the bad text (1-based).
        pass: usize,
        /// Parser diagnostic for the rewritten text.
        message: String,
    },
    /// A declaration of the flag cannot be removed coherently. The file
    /// is left untouched.
    #[error("flag declaration cannot be rewritten: {0}")]
    BadDeclaration(#[from] PruneError),
    /// Planned edits could not be applied to the text.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    /// The file did not reach a fixpoint within [`MAX_REWRITE_PASSES`].
    #[error("rewrite did not converge after {MAX_REWRITE_PASSES} passes")]
    PassBudgetExceeded,
}

/// Why a file was skipped without being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The ignore check rejected the module identity.
    IgnoredModule,
    /// The flag name never occurs in the raw source.
    NoFlagMention,
}

impl SkipReason {
    /// Stable label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IgnoredModule => "ignored_module",
            Self::NoFlagMention => "no_flag_mention",
        }
    }
}

/// Result of specializing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecializeOutcome {
    /// Gated out before parsing.
    Skipped(SkipReason),
    /// Parsed and visited, but nothing observed the flag.
    Unchanged,
    /// At least one construct was rewritten; `output` is the full new
    /// text.
    Rewritten {
        /// Replacement file contents.
        output: String,
        /// Number of plan/apply passes it took to converge.
        passes: usize,
    },
}

/// Specializes Python sources with respect to one flag.
#[derive(Debug, Clone)]
pub struct Specializer {
    spec: FlagSpec,
    gate: ModuleGate,
}

impl Specializer {
    #[must_use]
    pub fn new(spec: FlagSpec, gate: ModuleGate) -> Self {
        Self { spec, gate }
    }

    #[must_use]
    pub fn spec(&self) -> &FlagSpec {
        &self.spec
    }

    /// Specialize one module's source text.
    ///
    /// `module` is the dotted module identity used by the ignore check,
    /// when one could be derived.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecializeError`] when the file cannot be parsed, a
    /// pass produces unparseable text, or the pass budget runs out.
    pub fn specialize_module(
        &self,
        module: Option<&str>,
        source: &str,
    ) -> Result<SpecializeOutcome, SpecializeError> {
        match self.gate.decide(module, source) {
            GateDecision::IgnoredModule => {
                return Ok(SpecializeOutcome::Skipped(SkipReason::IgnoredModule));
            }
            GateDecision::NoFlagMention => {
                return Ok(SpecializeOutcome::Skipped(SkipReason::NoFlagMention));
            }
            GateDecision::Visit => {}
        }

        let mut aliases = AliasSet::for_flag(&self.spec);
        let mut current = source.to_owned();
        let mut passes = 0usize;
        loop {
            let parsed = match ruff_python_parser::parse_module(&current) {
                Ok(parsed) => parsed,
                Err(err) if passes == 0 => {
                    return Err(SpecializeError::Parse {
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    return Err(SpecializeError::ReparseFailed {
                        pass: passes,
                        message: err.to_string(),
                    });
                }
            };
            let module_ast = parsed.into_syntax();
            let index = LineIndex::new(&current);
            let edits = plan_pass(&current, &index, &self.spec, &mut aliases, &module_ast.body)?;
            if edits.is_empty() {
                break;
            }
            if passes == MAX_REWRITE_PASSES {
                return Err(SpecializeError::PassBudgetExceeded);
            }
            let mut rewriter = SourceRewriter::new(current);
            rewriter.add_edits(edits);
            current = rewriter.apply()?;
            passes += 1;
        }

        if passes == 0 {
            Ok(SpecializeOutcome::Unchanged)
        } else {
            Ok(SpecializeOutcome::Rewritten {
                output: current,
                passes,
            })
        }
    }
}
