//! Centralized configuration for folio.
//!
//! Compile-time defaults live as associated constants on unit structs; the
//! runtime knobs of a pipeline run are collected in [`PipelineConfig`].

use crate::cancel::CancellationToken;
use crate::network::{DelayRange, RetryConfig};
use crate::{FolioError, Result};
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://openlibrary.org/isbn";
    pub const USER_AGENT: &'static str = "Mozilla/5.0 (compatible; folio/0.1)";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const BACKOFF_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const BACKOFF_MAX_JITTER: Duration = Duration::from_secs(2);
    pub const BACKOFF_MAX_DELAY: Duration = Duration::from_secs(60);
    pub const RATE_LIMIT_MIN_DELAY: Duration = Duration::from_secs(5);
    pub const RATE_LIMIT_MAX_DELAY: Duration = Duration::from_secs(15);
    pub const RATE_LIMIT_MAX_RETRIES: u32 = 10;
    pub const POLITENESS_MIN_DELAY: Duration = Duration::from_secs(1);
    pub const POLITENESS_MAX_DELAY: Duration = Duration::from_secs(3);
}

/// Scrape batch configuration.
pub struct ScrapeConfig;

impl ScrapeConfig {
    // Kept small: the remote answers bursts with 429s.
    pub const DEFAULT_WORKERS: usize = 4;
    pub const DEFAULT_ID_COLUMN: &'static str = "ISBN";
    pub const DESCRIPTION_COLUMN: &'static str = "Description";
    pub const THEMES_COLUMN: &'static str = "Tags";
    pub const DEFAULT_OUTPUT_FILENAME: &'static str = "dataset_with_details.csv";
}

/// Cache file configuration.
pub struct CacheConfig;

impl CacheConfig {
    pub const DEFAULT_FILENAME: &'static str = "isbn_cache.json";
    pub const SCHEMA_VERSION: u32 = 1;
    pub const PREVIEW_COUNT: usize = 5;
    pub const PREVIEW_DESCRIPTION_CHARS: usize = 100;
}

/// How the fetcher reacts to HTTP 429.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Pause before restarting the fetch.
    pub delay: DelayRange,
    /// Maximum number of restarts per identifier.
    pub max_retries: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            delay: DelayRange::new(
                NetworkConfig::RATE_LIMIT_MIN_DELAY,
                NetworkConfig::RATE_LIMIT_MAX_DELAY,
            ),
            max_retries: NetworkConfig::RATE_LIMIT_MAX_RETRIES,
        }
    }
}

/// Runtime configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrent fetch workers.
    pub workers: usize,
    /// Backoff policy for transport failures.
    pub retry: RetryConfig,
    /// Policy for HTTP 429 responses.
    pub rate_limit: RateLimitPolicy,
    /// Pause after each successful fetch.
    pub politeness: DelayRange,
    /// Stops workers from taking new identifiers once cancelled.
    pub cancellation: CancellationToken,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: ScrapeConfig::DEFAULT_WORKERS,
            retry: RetryConfig::default(),
            rate_limit: RateLimitPolicy::default(),
            politeness: DelayRange::new(
                NetworkConfig::POLITENESS_MIN_DELAY,
                NetworkConfig::POLITENESS_MAX_DELAY,
            ),
            cancellation: CancellationToken::new(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitPolicy) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_politeness(mut self, politeness: DelayRange) -> Self {
        self.politeness = politeness;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(FolioError::Validation {
                field: "workers".into(),
                message: "at least one worker is required".into(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(FolioError::Validation {
                field: "max_attempts".into(),
                message: "at least one attempt is required".into(),
            });
        }
        Ok(())
    }
}
