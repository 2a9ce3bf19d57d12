//! Subcommand implementations.

use anyhow::{Context, Result};
use clap::Args;
use folio_core::{
    CacheConfig, CacheStore, CancellationToken, Dataset, HttpClient, NetworkConfig, Origin,
    Pipeline, PipelineConfig, RetryConfig, ScrapeConfig,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// CSV dataset with an identifier column
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the enriched dataset (defaults next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Cache file
    #[arg(long, default_value = CacheConfig::DEFAULT_FILENAME)]
    pub cache: PathBuf,

    /// Name of the identifier column
    #[arg(long, default_value = ScrapeConfig::DEFAULT_ID_COLUMN)]
    pub column: String,

    /// Concurrent fetch workers
    #[arg(short, long, default_value_t = ScrapeConfig::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Attempts per ISBN before giving up on transport errors
    #[arg(long, default_value_t = NetworkConfig::MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Base URL; the ISBN is appended as the last path segment
    #[arg(long, default_value = NetworkConfig::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = NetworkConfig::REQUEST_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Fetch ISBNs again whose cached outcome is a failure
    #[arg(long)]
    pub retry_failed: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Cache file
    #[arg(long, default_value = CacheConfig::DEFAULT_FILENAME)]
    pub cache: PathBuf,

    /// Number of entries to preview
    #[arg(short, long, default_value_t = CacheConfig::PREVIEW_COUNT)]
    pub limit: usize,
}

pub async fn scrape(args: ScrapeArgs) -> Result<()> {
    let dataset = Dataset::load(&args.input, &args.column)
        .with_context(|| format!("Cannot use dataset {}", args.input.display()))?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));

    let mut cache = CacheStore::open(&args.cache)
        .with_context(|| format!("Cannot open cache {}", args.cache.display()))?;
    if !cache.is_empty() {
        info!("Cache holds {} ISBNs ({})", cache.len(), cache.summary());
    }
    if args.retry_failed {
        let removed = cache.remove_failed();
        if removed > 0 {
            info!("Retrying {} previously failed ISBNs", removed);
            cache.flush()?;
        }
    }

    let remote = HttpClient::with_base_url(&args.base_url, Duration::from_secs(args.timeout_secs))?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&signal_token) {
                Interrupt::Drain => {
                    warn!("Interrupt received, finishing in-flight ISBNs (Ctrl-C again to quit)")
                }
                Interrupt::Exit => {
                    warn!("Second interrupt, exiting without waiting for in-flight ISBNs");
                    std::process::exit(130);
                }
            }
        }
    });

    let config = PipelineConfig::default()
        .with_workers(args.workers)
        .with_retry(RetryConfig::new().with_max_attempts(args.max_attempts))
        .with_cancellation(token);
    let mut pipeline = Pipeline::new(cache, Arc::new(remote), config)?;

    let mut outcomes = HashMap::new();
    let report = pipeline
        .run(dataset.identifiers(), |done| {
            let details = done.outcome.details();
            let source = match done.origin {
                Origin::Cache => " (cached)",
                Origin::Remote => "",
            };
            println!(
                "{} -> {} | Tags: {}{}",
                done.isbn, details.description, details.themes, source
            );
            outcomes.insert(done.isbn.clone(), done.outcome.clone());
        })
        .await?;

    dataset.write_enriched(&output, &outcomes)?;

    println!(
        "Done: {} ISBNs ({} cached, {} fetched, {} skipped): {}",
        report.total, report.cached, report.fetched, report.skipped, report.summary
    );
    println!("Results saved in {}", output.display());
    Ok(())
}

pub fn inspect(args: InspectArgs) -> Result<()> {
    match CacheStore::inspect(&args.cache, args.limit)? {
        Some(preview) => print!("{}", preview),
        None => println!("No cache file found at {}", args.cache.display()),
    }
    Ok(())
}

/// What an interrupt should do given the state of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// First interrupt: stop taking new ISBNs and let in-flight ones finish.
    Drain,
    /// Already draining: quit now. The cache file is always a complete snapshot.
    Exit,
}

fn on_interrupt(token: &CancellationToken) -> Interrupt {
    if token.is_cancelled() {
        Interrupt::Exit
    } else {
        token.cancel();
        Interrupt::Drain
    }
}

fn default_output(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(ScrapeConfig::DEFAULT_OUTPUT_FILENAME)
}
