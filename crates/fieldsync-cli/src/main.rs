//! FieldSync CLI - Command-line interface for FieldSync
//!
//! Provides commands for:
//! - Bulk-downloading reference data ahead of offline field work
//! - Pushing pending interviews to the survey server
//! - Viewing sync status and the pending worklist

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    download::DownloadCommand, pending::PendingCommand, status::StatusCommand, sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "fieldsync", version, about = "Offline-first field data sync for survey interviewers")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download reference data for assigned surveys
    Download(DownloadCommand),
    /// Push pending interviews and drain the retry queue
    Sync(SyncCommand),
    /// Show sync status counts and last sync/download times
    Status(StatusCommand),
    /// List interviews awaiting sync
    Pending(PendingCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Download(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Commands::Sync(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Commands::Status(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Commands::Pending(cmd) => cmd.execute(cli.config.as_deref(), format).await,
    }
}
