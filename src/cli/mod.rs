//! Command-line interface for qa-forge.
//!
//! Provides the `filter` and `analyze` commands over JSONL datasets.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, AnalyzeArgs, Cli, Commands, FilterArgs};
