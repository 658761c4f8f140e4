//! Command-line interface definition.

use clap::Parser;
use std::path::PathBuf;

const CONFIG_HELP: &str = "\
Configuration:
  Options can be pinned in a .flagprune.toml next to the scanned code;
  command-line values take precedence.

  [flagprune]
  flag = \"STALE_FLAG\"
  resolution_methods = [\"is_active\", \"is_control:control\"]
  ignored_module_check = \"test-prefix\"
  exclude_folders = [\"vendor\"]

Examples:
  # Preview retiring STALE_FLAG as permanently on
  flagprune --flag STALE_FLAG src/

  # Flag observed through a resolver; write the files
  flagprune --flag STALE_FLAG -m is_active --apply src/

  # Flag retired as permanently off
  flagprune --flag STALE_FLAG --polarity control src/
";

/// Retire a stale boolean feature flag from Python sources.
///
/// Specializes every conditional that observes the flag for its final
/// value, removes the branches that can no longer run, prunes the flag's
/// own declarations and imports, and drops statements made unreachable
/// by the rewrite. Runs as a dry run unless --apply is given.
#[derive(Parser, Debug)]
#[command(name = "flagprune", version, after_help = CONFIG_HELP)]
pub struct Cli {
    /// Files or directories to scan
    #[arg(value_name = "PATH", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Name of the flag being retired
    #[arg(short, long, value_name = "NAME")]
    pub flag: Option<String>,

    /// Resolver the flag is tested through, as NAME or NAME:POLARITY
    /// (repeatable; without this, bare `if FLAG:` tests are matched)
    #[arg(
        short = 'm',
        long = "resolution-method",
        value_name = "NAME[:POLARITY]"
    )]
    pub resolution_methods: Vec<String>,

    /// Final value of a bare flag test: treatment (on) or control (off)
    #[arg(long, value_name = "POLARITY")]
    pub polarity: Option<String>,

    /// Ignore-check applied to module identities (test-prefix or none)
    #[arg(long, value_name = "CHECK")]
    pub ignored_module_check: Option<String>,

    /// Write rewritten files in place (default is a dry run)
    #[arg(long)]
    pub apply: bool,

    /// Folder name to exclude from the walk (repeatable, supports *.ext)
    #[arg(long = "exclude-folder", value_name = "NAME")]
    pub exclude_folders: Vec<String>,

    /// Print a JSON report instead of the console output
    #[arg(long)]
    pub json: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}
