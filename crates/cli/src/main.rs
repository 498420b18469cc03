//! # jcheck CLI
//!
//! Command-line entry point that runs a single jcheck reconciliation pass
//! against one pull request.
//!
//! # Commands
//!
//! - `check-pr` - Run one reconciliation pass against a pull request
//! - `config` - Manage the CLI's own bot-level configuration file
//!
//! # Examples
//!
//! ```bash
//! # Check a pull request
//! jcheck check-pr --repo owner/repo --pr-number 123
//!
//! # Initialize configuration
//! jcheck config init
//! ```

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, instrument};

/// Command implementations for the CLI.
mod commands;

/// Configuration management for the CLI.
mod config;

/// Error types specific to the CLI.
mod errors;

use commands::{check_pr::CheckPrArgs, config_cmd::ConfigCommands};
use errors::CliError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Top-level CLI interface, defined with clap's derive API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands for the jcheck CLI.
#[derive(Subcommand)]
enum Commands {
    /// Run one jcheck reconciliation pass against a pull request
    #[command(name = "check-pr")]
    CheckPr(CheckPrArgs),

    /// Manage the CLI's own bot-level configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Main entry point for the jcheck CLI: initializes logging, parses
/// command-line arguments, and dispatches to the appropriate command
/// handler.
///
/// # Examples
///
/// ```bash
/// jcheck check-pr --repo owner/repo --pr-number 123
/// ```
#[tokio::main]
#[instrument]
async fn main() -> Result<(), CliError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty())
        .with(EnvFilter::from_env("JCHECK_LOG"))
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set verbose logging if requested
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    // Execute the appropriate command
    match cli.command {
        Commands::CheckPr(args) => match commands::check_pr::execute(args).await {
            Ok(result) => {
                return Ok(result);
            }
            Err(e) => {
                error!("Error validating pull requests: {}", e);
                return Err(e);
            }
        },
        Commands::Config(cmd) => {
            if let Err(e) = commands::config_cmd::execute(cmd).await {
                error!("Error executing config command: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}
