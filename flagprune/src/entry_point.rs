//! Shared CLI entry point: argument parsing, configuration merging, and
//! dispatch into the rewrite command.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::commands::{run_rewrite, RewriteOptions};
use crate::config::{load_config, ConfigSection};
use crate::flag::{parse_method_arg, ConfigError, FlagSpec, Polarity, ResolutionMode};
use crate::gate::{ModuleGate, IGNORE_CHECK_TEST_PREFIX};
use crate::specializer::Specializer;

/// Run flagprune with the given arguments (program name excluded).
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Testable variant of [`run_with_args`] that writes report output to
/// `writer`. Diagnostics still go to stderr.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn run_with_args_to<W: Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["flagprune".to_owned()];
    program_args.extend(args);
    let cli = match Cli::try_parse_from(program_args) {
        Ok(cli) => cli,
        Err(err) => {
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    write!(writer, "{err}")?;
                    writer.flush()?;
                    Ok(0)
                }
                _ => {
                    eprint!("{err}");
                    Ok(1)
                }
            };
        }
    };

    for path in &cli.paths {
        if !path.exists() {
            eprintln!(
                "Error: the file or directory '{}' does not exist.",
                path.display()
            );
            return Ok(1);
        }
    }

    // Config errors fail the whole invocation before any file is touched.
    let config = match load_config(&config_dir_for(&cli.paths)) {
        Ok(section) => section,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return Ok(1);
        }
    };
    let spec = match build_spec(&cli, &config) {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(1);
        }
    };
    let check_name = cli
        .ignored_module_check
        .clone()
        .or_else(|| config.ignored_module_check.clone())
        .unwrap_or_else(|| IGNORE_CHECK_TEST_PREFIX.to_owned());
    let gate = match ModuleGate::with_named_check(&spec, &check_name) {
        Ok(gate) => gate,
        Err(err) => {
            eprintln!("Error: {err}");
            return Ok(1);
        }
    };

    let mut exclude_folders = config.exclude_folders.clone();
    exclude_folders.extend(cli.exclude_folders.clone());

    let options = RewriteOptions {
        apply: cli.apply || config.apply,
        json: cli.json || config.json,
        verbose: cli.verbose,
        quiet: cli.quiet,
        exclude_folders,
    };

    if cli.verbose && !options.json {
        eprintln!("[VERBOSE] flagprune v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("[VERBOSE] Using {} threads", rayon::current_num_threads());
        eprintln!("[VERBOSE] Configuration:");
        eprintln!("   Flag: {}", spec.flag_name());
        match spec.mode() {
            ResolutionMode::Bare => {
                if let Some(polarity) = spec.bare_polarity() {
                    eprintln!("   Mode: bare ({polarity})");
                }
            }
            ResolutionMode::ViaResolvers(methods) => {
                let described: Vec<String> = methods
                    .iter()
                    .map(|m| format!("{}:{}", m.method_name, m.polarity))
                    .collect();
                eprintln!("   Mode: resolvers {described:?}");
            }
        }
        eprintln!("   Ignore check: {check_name}");
        eprintln!("   Apply: {}", options.apply);
        eprintln!("   Paths: {:?}", cli.paths);
        if !options.exclude_folders.is_empty() {
            eprintln!("   Exclude folders: {:?}", options.exclude_folders);
        }
        eprintln!();
    }

    let specializer = Specializer::new(spec, gate);
    let summary = run_rewrite(&specializer, &cli.paths, &options, writer)?;
    Ok(i32::from(summary.failed > 0))
}

/// Directory the configuration file is looked up in: the first scan root,
/// or the parent directory when that root is a single file.
fn config_dir_for(paths: &[PathBuf]) -> PathBuf {
    match paths.first() {
        Some(path) if path.is_file() => path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        Some(path) => path.clone(),
        None => PathBuf::from("."),
    }
}

/// Merge CLI arguments over config values into a flag specification.
/// CLI wins field by field; resolver methods given on the command line
/// replace the configured list entirely.
fn build_spec(cli: &Cli, config: &ConfigSection) -> Result<FlagSpec, ConfigError> {
    let flag_name = cli
        .flag
        .as_deref()
        .or(config.flag.as_deref())
        .ok_or(ConfigError::MissingFlagName)?;

    let methods = if cli.resolution_methods.is_empty() {
        config.resolution_methods.clone()
    } else {
        Some(cli.resolution_methods.clone())
    };
    match methods {
        None => {
            let polarity = match cli.polarity.as_deref().or(config.polarity.as_deref()) {
                Some(value) => value.parse::<Polarity>()?,
                None => Polarity::Treatment,
            };
            Ok(FlagSpec::bare(flag_name)?.with_polarity(polarity))
        }
        // An explicitly empty configured list is rejected by the
        // constructor, not silently treated as bare mode.
        Some(args) => {
            let parsed = args
                .iter()
                .map(|arg| parse_method_arg(arg))
                .collect::<Result<Vec<_>, _>>()?;
            FlagSpec::via_resolvers(flag_name, parsed)
        }
    }
}
