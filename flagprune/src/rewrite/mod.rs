//! The rewrite engine: byte-range edits over original source text, the
//! per-pass planner that produces them, and the declaration pruner.
//!
//! Rendering is lossless by construction. Edits replace exact byte
//! ranges of the original text, so formatting, comments, and whitespace
//! outside the touched ranges survive untouched.

pub mod edit;
pub mod planner;
pub mod pruner;

pub use edit::{Edit, RewriteError, SourceRewriter};
pub use planner::plan_pass;
pub use pruner::PruneError;
