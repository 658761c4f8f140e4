//! Classification of conditional tests against the flag specification.
//!
//! The matcher is a pure query: it inspects one expression and reports
//! whether it observes the flag (directly, negated, or through a resolver
//! call) without touching any rewrite state.

use compact_str::CompactString;
use ruff_python_ast::{Expr, UnaryOp};
use rustc_hash::FxHashSet;

use crate::flag::{FlagSpec, Polarity};

/// Local names that resolve to the flag within one file.
///
/// Seeded with the canonical flag name; import aliases are added as they
/// are discovered. The set only grows, so a name that resolved once keeps
/// resolving for the rest of the file, including later rewrite passes.
#[derive(Debug)]
pub struct AliasSet {
    names: FxHashSet<CompactString>,
}

impl AliasSet {
    /// A fresh set containing only the canonical flag name.
    #[must_use]
    pub fn for_flag(spec: &FlagSpec) -> Self {
        let mut names = FxHashSet::default();
        names.insert(CompactString::from(spec.flag_name()));
        Self { names }
    }

    /// Record a local rebinding of the flag (`from mod import FLAG as F`).
    pub fn record_alias(&mut self, name: &str) {
        self.names.insert(CompactString::from(name));
    }

    /// Whether `name` refers to the flag in this file.
    #[must_use]
    pub fn resolves(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// What one conditional test says about the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagTest {
    /// The expression does not observe the flag. Leave it alone.
    NotAFlag,
    /// A direct observation: `FLAG`, or `is_active(FLAG)`.
    Positive(Polarity),
    /// A negated observation: `not FLAG`, or `not is_active(FLAG)`.
    Negative(Polarity),
}

impl FlagTest {
    /// The constant value the test specializes to, or `None` when the
    /// expression is not a flag observation.
    ///
    /// A positive observation is true under Treatment polarity; a negated
    /// one is true under Control.
    #[must_use]
    pub fn evaluates_true(self) -> Option<bool> {
        match self {
            Self::NotAFlag => None,
            Self::Positive(polarity) => Some(polarity == Polarity::Treatment),
            Self::Negative(polarity) => Some(polarity == Polarity::Control),
        }
    }
}

/// Classify one conditional test expression.
///
/// Only whole-test observations match: a single negation is recognized,
/// but the flag buried in a larger expression (`FLAG and other`,
/// `not not FLAG`) is not a flag test and is left untouched.
#[must_use]
pub fn classify_test(spec: &FlagSpec, aliases: &AliasSet, expr: &Expr) -> FlagTest {
    match expr {
        Expr::Name(name) => match spec.bare_polarity() {
            Some(polarity) if aliases.resolves(name.id.as_str()) => FlagTest::Positive(polarity),
            _ => FlagTest::NotAFlag,
        },
        Expr::UnaryOp(unary) if unary.op == UnaryOp::Not => {
            match classify_test(spec, aliases, &unary.operand) {
                FlagTest::Positive(polarity) => FlagTest::Negative(polarity),
                // A doubly negated flag is a compound expression, not a
                // direct observation.
                FlagTest::Negative(_) | FlagTest::NotAFlag => FlagTest::NotAFlag,
            }
        }
        Expr::Call(call) => {
            let Some(callee) = callee_name(&call.func) else {
                return FlagTest::NotAFlag;
            };
            let Some(polarity) = spec.resolver_polarity(callee) else {
                return FlagTest::NotAFlag;
            };
            if call
                .arguments
                .args
                .iter()
                .any(|arg| is_flag_reference(aliases, arg))
            {
                FlagTest::Positive(polarity)
            } else {
                FlagTest::NotAFlag
            }
        }
        _ => FlagTest::NotAFlag,
    }
}

/// Whether `expr` is a plain name that resolves to the flag.
#[must_use]
pub fn is_flag_reference(aliases: &AliasSet, expr: &Expr) -> bool {
    match expr {
        Expr::Name(name) => aliases.resolves(name.id.as_str()),
        _ => false,
    }
}

/// The name a call target answers to: a bare name, or the final component
/// of a dotted path (`ff.is_active` resolves as `is_active`).
fn callee_name(func: &Expr) -> Option<&str> {
    match func {
        Expr::Name(name) => Some(name.id.as_str()),
        Expr::Attribute(attr) => Some(attr.attr.as_str()),
        _ => None,
    }
}
