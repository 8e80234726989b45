pub mod commands;
pub mod logging;
pub mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use showtally_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "showtally",
    about = "Daily ticket-sales and online-store summary",
    long_about = "Fetch ticket counts from the configured vendors, record daily \
                  snapshots, and email a formatted summary.",
    after_help = "Examples:\n  showtally report --no-email\n  showtally snapshot\n  \
                  showtally backfill --key quicket:349783 --date 2025-11-04 --total 231"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the TOML config file (default: showtally.toml)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Fetch all sources, record snapshots, and email the daily summary")]
    Report {
        #[arg(long, help = "Print the summary to stdout instead of emailing it")]
        no_email: bool,
    },
    #[command(about = "Fetch and record today's snapshots without building a report")]
    Snapshot,
    #[command(about = "Merge one date's total into an entity's snapshot history")]
    Backfill {
        #[arg(long, help = "Snapshot key: an event GUID or a namespaced id like `quicket:349783`")]
        key: String,
        #[arg(long, help = "Calendar date (YYYY-MM-DD)")]
        date: NaiveDate,
        #[arg(long, help = "Cumulative total sold as of that date")]
        total: i64,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::from(2);
        }
    };
    logging::init(&config.logging);

    let result = match cli.command {
        Command::Report { no_email } => commands::report::run(&config, no_email).await,
        Command::Snapshot => commands::snapshot::run(&config).await,
        Command::Backfill { key, date, total } => {
            commands::backfill::run(&config, &key, date, total)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
