//! Project configuration from `.flagprune.toml`.
//!
//! Everything has a CLI equivalent; the file just pins the invocation
//! next to the code it edits. CLI values win over file values.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// File name looked up in the scan root.
pub const CONFIG_FILE_NAME: &str = ".flagprune.toml";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    flagprune: ConfigSection,
}

/// The `[flagprune]` table.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigSection {
    /// Flag being retired.
    pub flag: Option<String>,
    /// Resolver methods, `NAME` or `NAME:POLARITY` each.
    pub resolution_methods: Option<Vec<String>>,
    /// Polarity of a bare flag test.
    pub polarity: Option<String>,
    /// Ignore-check name applied to module identities.
    pub ignored_module_check: Option<String>,
    /// Extra folder names to exclude from the walk.
    pub exclude_folders: Vec<String>,
    /// Write files in place instead of a dry run.
    pub apply: bool,
    /// Emit the JSON report.
    pub json: bool,
}

/// Load configuration from `dir`, or defaults when no file exists.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_config(dir: &Path) -> anyhow::Result<ConfigSection> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(ConfigSection::default());
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: ConfigFile = toml::from_str(&text)
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(parsed.flagprune)
}
