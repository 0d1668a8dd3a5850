//! lintel CLI tool.
//!
//! Usage:
//! ```bash
//! lintel check [OPTIONS] [PATH]
//! lintel list-rules
//! lintel init [--force]
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;
mod discover;
mod reports;

/// Configurable static analysis for Rust sources
#[derive(Parser)]
#[command(name = "lintel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run lint checks
    Check(commands::check::CheckArgs),

    /// List available rules with their effective activation and severity
    ListRules,

    /// Write a lintel.toml with the built-in defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Console output format for lint results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Graphical diagnostics with source snippets.
    Pretty,
    /// JSON output.
    Json,
    /// One-line-per-finding compact format.
    Compact,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => {
            let failed = commands::check::run(&args, cli.config.as_deref())?;
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::ListRules => {
            let source = config_resolver::resolve(Path::new("."), cli.config.as_deref());
            let config = source.load().context("Failed to load config")?;
            commands::list_rules::run(config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => {
            commands::init::run(Path::new("."), force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
