//! # commitsmith
//!
//! Reads the staged and unstaged changes of a git working tree, asks a text
//! generation backend to group them into atomic commits, validates the
//! answer, and prints the `git add` / `git commit` commands that would
//! realize each group.
//!
//! ## Pipeline
//!
//! 1. [`git::DiffSource`] yields the staged and unstaged diff text.
//! 2. [`git::split_by_file`] segments the combined text per file.
//! 3. [`ai::build_grouping_prompt`] embeds the per-file map in a prompt.
//! 4. A [`ai::GenerationBackend`] answers with JSON.
//! 5. [`ai::response::parse_commit_plan`] validates the answer.
//! 6. [`git::synthesize`] turns each group into shell commands.
//!
//! [`pipeline::Orchestrator`] sequences these steps.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod cli;
pub mod git;
pub mod pipeline;
pub mod utils;

pub use crate::cli::Cli;
pub use crate::pipeline::{Orchestrator, Outcome};

/// The current version of commitsmith.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
