//! Casha sync CLI
//!
//! Runs the sync engine against a JSON fixture of local and remote state.
//!
//! # Commands
//!
//! - `run` - Push then pull one domain, or all of them
//! - `status` - Show unsynced counts and local summaries
//! - `version` - Show version information

mod commands;

use casha_model::Domain;
use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Casha offline-first sync driver.
#[derive(Parser)]
#[command(name = "casha-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the fixture file
    #[arg(global = true, short, long)]
    fixture: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass
    Run {
        /// Only sync this domain
        #[arg(short, long)]
        domain: Option<Domain>,

        /// Simulate a device without network
        #[arg(long)]
        offline: bool,

        /// Write the resulting local and remote state here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Per-call timeout in milliseconds
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show unsynced counts, cashflow and budget summaries
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            domain,
            offline,
            output,
            timeout_ms,
            format,
        } => {
            let fixture = cli.fixture.ok_or("Fixture path required for run")?;
            let options = commands::run::RunOptions {
                domain,
                offline,
                output,
                call_timeout: Duration::from_millis(timeout_ms),
            };
            let report = commands::run::run(&fixture, &options).await?;
            println!("{}", commands::run::render(&report, format)?);
        }
        Commands::Status { format } => {
            let fixture = cli.fixture.ok_or("Fixture path required for status")?;
            let report = commands::status::run(&fixture)?;
            println!("{}", commands::status::render(&report, format)?);
        }
        Commands::Version => {
            println!("Casha sync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
