//! folio - enrich a book dataset with descriptions and themes.
//!
//! `folio scrape` reads a CSV, fetches details for every unique ISBN through
//! the on-disk cache and writes the dataset back out with two new columns.
//! `folio inspect` previews the cache without touching it.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{InspectArgs, ScrapeArgs};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Scrape book descriptions and themes into a dataset")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch details for every ISBN in a dataset and write the enriched copy
    Scrape(ScrapeArgs),
    /// Show how many ISBNs are cached and preview the first few
    Inspect(InspectArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Command::Scrape(args) => commands::scrape(args).await,
        Command::Inspect(args) => commands::inspect(args),
    }
}
