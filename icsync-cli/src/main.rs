mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "icsync", version, about = "Sync .ics files into Google Calendar")]
struct Cli {
    /// Path to the config file.
    #[arg(short, long, default_value = "icsync.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the source file against the calendar and apply changes.
    Sync,
    /// Show what a sync would do, without applying anything.
    Status,
    /// Manage the calendars of the configured account.
    Calendars {
        #[command(subcommand)]
        command: CalendarCommand,
    },
}

#[derive(Subcommand)]
enum CalendarCommand {
    /// List the account's calendars.
    List,
    /// Create a new calendar.
    Create {
        summary: String,
        /// IANA time zone for the new calendar.
        #[arg(long)]
        timezone: Option<String>,
        /// Make the calendar readable by everyone.
        #[arg(long)]
        public: bool,
    },
    /// Change a calendar's displayed name.
    Rename { id: String, summary: String },
    /// Delete a calendar.
    Remove { id: String },
    /// Grant owner access to another account.
    AddOwner { id: String, email: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load(&cli.config)?;

    match cli.command {
        Commands::Sync => commands::sync::run(&config, true).await,
        Commands::Status => commands::sync::run(&config, false).await,
        Commands::Calendars { command } => commands::calendars::run(&config, command).await,
    }
}
