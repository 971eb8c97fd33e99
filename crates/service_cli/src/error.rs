//! CLI error types

use pricer_aad::{AadError, ConfigError};
use pricer_core::numeric::NumericError;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The AD engine rejected an operation.
    #[error("AAD error: {0}")]
    Aad(#[from] AadError),

    /// A simulated value could not be built.
    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),

    /// A command-line argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operator self-check found partials outside tolerance.
    #[error("Self-check failed for: {}", .0.join(", "))]
    CheckFailed(Vec<String>),

    /// Report serialisation failed.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
