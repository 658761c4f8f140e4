//! Per-file gating: decide whether a module is worth parsing at all.
//!
//! Two gates run before any parse. A configurable ignore check skips
//! modules by identity (test modules by default), and a cheap substring
//! scan skips files that never mention the flag.

use compact_str::CompactString;
use std::path::{Component, Path};
use std::sync::Arc;

use crate::constants;
use crate::flag::{ConfigError, FlagSpec};

/// Registry name for the default check: skip modules whose name starts
/// with `test_`.
pub const IGNORE_CHECK_TEST_PREFIX: &str = "test-prefix";
/// Registry name for the no-op check: visit every module.
pub const IGNORE_CHECK_NONE: &str = "none";

/// Predicate over a module identity; `true` means skip the module.
pub type IgnoreCheck = Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>;

/// Look up an ignore check by registry name.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownIgnoreCheck`] for a name with no
/// registry entry.
pub fn ignore_check_by_name(name: &str) -> Result<IgnoreCheck, ConfigError> {
    match name {
        IGNORE_CHECK_TEST_PREFIX => Ok(Arc::new(|module: Option<&str>| {
            module.is_some_and(|m| constants::get_test_module_re().is_match(m))
        })),
        IGNORE_CHECK_NONE => Ok(Arc::new(|_| false)),
        other => Err(ConfigError::UnknownIgnoreCheck {
            name: other.to_owned(),
        }),
    }
}

/// Why a file was (or was not) admitted for rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Parse and rewrite this file.
    Visit,
    /// The ignore check rejected the module identity.
    IgnoredModule,
    /// The source never mentions the flag name.
    NoFlagMention,
}

/// The combined per-file gate.
#[derive(Clone)]
pub struct ModuleGate {
    flag_name: CompactString,
    ignore_check: IgnoreCheck,
}

impl ModuleGate {
    /// Gate for `spec` with an explicit ignore check.
    #[must_use]
    pub fn new(spec: &FlagSpec, ignore_check: IgnoreCheck) -> Self {
        Self {
            flag_name: CompactString::from(spec.flag_name()),
            ignore_check,
        }
    }

    /// Gate for `spec` with a registry-named ignore check.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownIgnoreCheck`] for an unknown name.
    pub fn with_named_check(spec: &FlagSpec, check_name: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(spec, ignore_check_by_name(check_name)?))
    }

    /// Evaluate both gates for one file. The ignore check runs first, so
    /// an ignored test module is reported as ignored even when it
    /// mentions the flag.
    #[must_use]
    pub fn decide(&self, module: Option<&str>, source: &str) -> GateDecision {
        if (self.ignore_check)(module) {
            GateDecision::IgnoredModule
        } else if source.contains(self.flag_name.as_str()) {
            GateDecision::Visit
        } else {
            GateDecision::NoFlagMention
        }
    }

    /// Convenience wrapper over [`ModuleGate::decide`].
    #[must_use]
    pub fn should_visit(&self, module: Option<&str>, source: &str) -> bool {
        self.decide(module, source) == GateDecision::Visit
    }
}

impl std::fmt::Debug for ModuleGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleGate")
            .field("flag_name", &self.flag_name)
            .finish_non_exhaustive()
    }
}

/// Dotted module identity of a Python file relative to the scan root.
///
/// `pkg/util/helpers.py` becomes `pkg.util.helpers`; a package
/// `__init__.py` takes the package's identity. Returns `None` when no
/// identity can be formed (the scan root's own `__init__.py`, or a
/// non-UTF-8 path).
#[must_use]
pub fn module_identity(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let components: Vec<_> = relative.components().collect();
    let mut parts: Vec<&str> = Vec::with_capacity(components.len());
    for (index, component) in components.iter().enumerate() {
        let Component::Normal(os) = component else {
            return None;
        };
        let text = os.to_str()?;
        if index + 1 == components.len() {
            let stem = text.strip_suffix(".py").unwrap_or(text);
            if stem != "__init__" {
                parts.push(stem);
            }
        } else {
            parts.push(text);
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}
