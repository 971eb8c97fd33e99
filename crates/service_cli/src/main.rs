//! aad CLI - Command Line Front End for the AAD Engine
//!
//! # Commands
//!
//! - `aad greeks` - Monte Carlo European call greeks from one reverse sweep,
//!   compared with Black-Scholes
//! - `aad check` - finite-difference self-check of every operator
//!
//! Engine settings come from `--config <file>` (TOML) and the `AAD_*`
//! environment overrides.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pricer_aad::verify::{DEFAULT_STEP, DEFAULT_TOLERANCE};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod analytic;
mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use commands::greeks::GreeksArgs;
use commands::OutputFormat;

/// Adjoint algorithmic differentiation for Monte Carlo values
#[derive(Parser)]
#[command(name = "aad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monte Carlo greeks of a European call via AAD
    Greeks(GreeksArgs),

    /// Compare every operator partial with a central finite difference
    Check {
        /// Finite-difference bump size
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: f64,

        /// Maximum absolute error accepted
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    debug!("Verbose mode enabled");

    match cli.command {
        Commands::Greeks(args) => {
            let config = config::load(cli.config.as_deref())
                .context("failed to load engine configuration")?;
            commands::greeks::run(&args, &config).context("greeks command failed")?;
        }
        Commands::Check {
            step,
            tolerance,
            format,
        } => commands::check::run(step, tolerance, format).context("operator self-check failed")?,
    }
    Ok(())
}
