//! Flag specification: which identifier is being retired, how its value is
//! observed in source, and which behavior survives.

use compact_str::CompactString;
use std::fmt;
use thiserror::Error;

/// Which way a positive observation of the flag reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// A positive observation means the flag is active. Retiring keeps the
    /// enabled behavior.
    Treatment,
    /// A positive observation means the flag is inactive. Retiring keeps the
    /// disabled behavior.
    Control,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Treatment => f.write_str("treatment"),
            Self::Control => f.write_str("control"),
        }
    }
}

impl std::str::FromStr for Polarity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "treatment" => Ok(Self::Treatment),
            "control" => Ok(Self::Control),
            other => Err(ConfigError::UnknownPolarity {
                value: other.to_owned(),
            }),
        }
    }
}

/// One resolver function through which the flag may be tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverMethod {
    /// Name of the resolver callable (`is_active` in `is_active(FLAG)`).
    pub method_name: CompactString,
    /// What a positive result of this resolver means.
    pub polarity: Polarity,
}

impl ResolverMethod {
    /// Build a resolver entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMethodName`] if the name is not an
    /// identifier.
    pub fn new(method_name: &str, polarity: Polarity) -> Result<Self, ConfigError> {
        if !is_identifier(method_name) {
            return Err(ConfigError::InvalidMethodName(method_name.to_owned()));
        }
        Ok(Self {
            method_name: CompactString::from(method_name),
            polarity,
        })
    }
}

/// How flag observations appear in source. The two modes are mutually
/// exclusive for one invocation: under `ViaResolvers`, a bare `if FLAG:`
/// never matches, and under `Bare`, resolver calls never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionMode {
    /// The flag identifier itself is the conditional test (`if FLAG:`).
    Bare,
    /// The flag is passed to one of an ordered set of resolver functions
    /// (`if is_active(FLAG):`).
    ViaResolvers(Vec<ResolverMethod>),
}

/// Immutable per-invocation description of the flag being retired.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    flag_name: CompactString,
    mode: ResolutionMode,
    /// Polarity of a bare observation; resolver entries carry their own.
    polarity: Polarity,
}

impl FlagSpec {
    /// Specification for a flag tested as a bare identifier, retired as
    /// rolled out (Treatment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFlagName`] if the name is not an
    /// identifier.
    pub fn bare(flag_name: &str) -> Result<Self, ConfigError> {
        if !is_identifier(flag_name) {
            return Err(ConfigError::InvalidFlagName(flag_name.to_owned()));
        }
        Ok(Self {
            flag_name: CompactString::from(flag_name),
            mode: ResolutionMode::Bare,
            polarity: Polarity::Treatment,
        })
    }

    /// Specification for a flag tested through a single resolver, which
    /// implies Treatment polarity.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either name is not an identifier.
    pub fn with_resolver(flag_name: &str, method_name: &str) -> Result<Self, ConfigError> {
        let method = ResolverMethod::new(method_name, Polarity::Treatment)?;
        Self::via_resolvers(flag_name, vec![method])
    }

    /// Specification for a flag tested through an ordered list of resolvers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoResolutionMethods`] for an empty list, or
    /// [`ConfigError::InvalidFlagName`] for a malformed flag name.
    pub fn via_resolvers(
        flag_name: &str,
        methods: Vec<ResolverMethod>,
    ) -> Result<Self, ConfigError> {
        if !is_identifier(flag_name) {
            return Err(ConfigError::InvalidFlagName(flag_name.to_owned()));
        }
        if methods.is_empty() {
            return Err(ConfigError::NoResolutionMethods);
        }
        Ok(Self {
            flag_name: CompactString::from(flag_name),
            mode: ResolutionMode::ViaResolvers(methods),
            polarity: Polarity::Treatment,
        })
    }

    /// Override the bare-observation polarity (retire the flag as
    /// permanently off). Ignored under `ViaResolvers`.
    #[must_use]
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// The canonical flag identifier, as declared at its source.
    #[must_use]
    pub fn flag_name(&self) -> &str {
        &self.flag_name
    }

    /// The configured resolution mode.
    #[must_use]
    pub fn mode(&self) -> &ResolutionMode {
        &self.mode
    }

    /// Polarity of a bare observation, or `None` under `ViaResolvers`.
    #[must_use]
    pub fn bare_polarity(&self) -> Option<Polarity> {
        match self.mode {
            ResolutionMode::Bare => Some(self.polarity),
            ResolutionMode::ViaResolvers(_) => None,
        }
    }

    /// Polarity of a call to `callee`, or `None` if `callee` is not a
    /// configured resolver (always `None` under `Bare`).
    #[must_use]
    pub fn resolver_polarity(&self, callee: &str) -> Option<Polarity> {
        match &self.mode {
            ResolutionMode::Bare => None,
            ResolutionMode::ViaResolvers(methods) => methods
                .iter()
                .find(|m| m.method_name == callee)
                .map(|m| m.polarity),
        }
    }
}

/// Parse a CLI resolution-method argument: `NAME` or `NAME:POLARITY`.
///
/// A bare `NAME` implies Treatment polarity.
///
/// # Errors
///
/// Returns a [`ConfigError`] for a malformed name or unknown polarity.
pub fn parse_method_arg(arg: &str) -> Result<ResolverMethod, ConfigError> {
    match arg.split_once(':') {
        None => ResolverMethod::new(arg.trim(), Polarity::Treatment),
        Some((name, polarity)) => ResolverMethod::new(name.trim(), polarity.parse()?),
    }
}

/// True for a (unicode) identifier: letter or underscore, then letters,
/// digits, or underscores.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Errors that reject an invocation before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A resolver-based invocation was configured with an empty method list.
    #[error("no resolution methods supplied")]
    NoResolutionMethods,
    /// The flag name is not a plain identifier.
    #[error("invalid flag name {0:?}")]
    InvalidFlagName(String),
    /// A resolver method name is not a plain identifier.
    #[error("invalid resolver method name {0:?}")]
    InvalidMethodName(String),
    /// A polarity string is neither `treatment` nor `control`.
    #[error("unknown polarity {value:?} (expected \"treatment\" or \"control\")")]
    UnknownPolarity {
        /// The rejected value.
        value: String,
    },
    /// An ignored-module check name has no registry entry.
    #[error("unknown ignored-module check {name:?} (expected \"test-prefix\" or \"none\")")]
    UnknownIgnoreCheck {
        /// The rejected name.
        name: String,
    },
    /// No flag name was given on the CLI or in configuration.
    #[error("a flag name is required (pass --flag or set it in .flagprune.toml)")]
    MissingFlagName,
}
