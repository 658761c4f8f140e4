//! Core library for the flagprune source specializer.
//!
//! Given a feature-flag specification, this library rewrites Python
//! sources as if the flag had its configured final value: flag
//! conditionals collapse to the surviving branch, flag declarations and
//! imports disappear, and statements made unreachable by an inlined
//! return are truncated.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Command-line argument definitions.
pub mod cli;

/// The rewrite command: batch execution, reporting, and in-place writes.
pub mod commands;

/// Loading of the `.flagprune.toml` configuration file.
pub mod config;

/// Shared constants and compiled regex patterns.
pub mod constants;

/// CLI entry point: argument parsing and configuration merging.
pub mod entry_point;

/// Flag specifications: names, resolver methods, and polarity.
pub mod flag;

/// Module gating: ignore checks and the textual pre-filter.
pub mod gate;

/// Classification of conditional tests against a flag specification.
pub mod matcher;

/// Progress, JSON report, and summary-table rendering.
pub mod output;

/// Parallel batch processing of files and directory trees.
pub mod processing;

/// Edit planning and application over original source text.
pub mod rewrite;

/// The per-module fixpoint driver.
pub mod specializer;

/// Path, line-index, and file-collection helpers.
pub mod utils;
