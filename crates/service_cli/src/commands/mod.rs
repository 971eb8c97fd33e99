//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod check;
pub mod greeks;

use clap::ValueEnum;

/// How a command prints its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Box-drawn table on stdout
    Table,
    /// Pretty-printed JSON on stdout
    Json,
}
