// src/main.rs

mod browser;
mod config;
mod error;
mod schedule;
mod scrape;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use scrape::{ScrapeArgs, WatchArgs};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot outage-schedule scrape for the configured address
    Scrape(ScrapeArgs),
    /// Keep the schedule fresh via the daily refetch window
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file, if present
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    // Parse command-line arguments
    let cli = Cli::parse();
    match cli.command {
        Commands::Scrape(args) => {
            scrape::run(args).await.context("Scrape failed")?;
        }
        Commands::Watch(args) => {
            scrape::watch(args).await.context("Watch failed")?;
        }
    }

    Ok(())
}
