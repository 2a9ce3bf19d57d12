//! Fetch one identifier into a [`FetchOutcome`].
//!
//! Two independent retry paths:
//! - transport failures and unexpected statuses back off exponentially, up to
//!   `RetryConfig::max_attempts`;
//! - HTTP 429 pauses for a random rate-limit delay and restarts the whole fetch
//!   with a fresh attempt budget, up to `RateLimitPolicy::max_retries` times.

use crate::config::{PipelineConfig, RateLimitPolicy};
use crate::identifier::Isbn;
use crate::network::{retry_async, DelayRange, Remote, RemoteResponse, RetryConfig};
use crate::outcome::FetchOutcome;
use crate::parser::DetailsParser;
use crate::FolioError;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a single backoff-bounded fetch ended with.
enum Attempt {
    Done(FetchOutcome),
    RateLimited,
}

/// Fetches and parses book details for one identifier at a time.
pub struct Fetcher {
    remote: Arc<dyn Remote>,
    parser: DetailsParser,
    retry: RetryConfig,
    rate_limit: RateLimitPolicy,
    politeness: DelayRange,
}

impl Fetcher {
    pub fn new(remote: Arc<dyn Remote>, config: &PipelineConfig) -> Self {
        Self {
            remote,
            parser: DetailsParser::new(),
            retry: config.retry.clone(),
            rate_limit: config.rate_limit.clone(),
            politeness: config.politeness,
        }
    }

    /// Fetch `isbn`. Never fails: every error ends up as an outcome.
    pub async fn fetch(&self, isbn: &Isbn) -> FetchOutcome {
        let mut rate_limited = 0u32;

        loop {
            match self.fetch_with_backoff(isbn).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::RateLimited => {
                    rate_limited += 1;
                    let err = FolioError::RateLimited {
                        service: self.remote.service(),
                    };
                    if rate_limited > self.rate_limit.max_retries {
                        warn!(
                            "{} for ISBN {} after {} retries, giving up",
                            err, isbn, self.rate_limit.max_retries
                        );
                        return FetchOutcome::Failed;
                    }

                    let delay = self.rate_limit.delay.sample();
                    warn!(
                        "{} for ISBN {}. Retrying in {:.2?} ({}/{})",
                        err, isbn, delay, rate_limited, self.rate_limit.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_with_backoff(&self, isbn: &Isbn) -> Attempt {
        let (result, stats) = retry_async(
            &self.retry,
            || self.request(isbn),
            FolioError::is_retryable,
        )
        .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "ISBN {} failed after {} attempts: {}",
                    isbn, stats.attempts, e
                );
                return Attempt::Done(FetchOutcome::Failed);
            }
        };

        if response.is_rate_limited() {
            return Attempt::RateLimited;
        }

        if response.is_not_found() {
            let err = FolioError::NotFound {
                isbn: isbn.to_string(),
            };
            warn!("{} on {}. Skipping.", err, self.remote.service());
            return Attempt::Done(FetchOutcome::NotFound);
        }

        let details = self.parser.parse(&response.body);
        let pause = self.politeness.sleep().await;
        debug!("Fetched ISBN {} (politeness pause {:.2?})", isbn, pause);
        Attempt::Done(FetchOutcome::success(details))
    }

    /// One request. Statuses the fetcher handles itself come back as `Ok`;
    /// anything else is an error for the backoff loop.
    async fn request(&self, isbn: &Isbn) -> crate::Result<RemoteResponse> {
        let response = self.remote.fetch(isbn).await?;
        if response.is_success() || response.is_not_found() || response.is_rate_limited() {
            Ok(response)
        } else {
            Err(FolioError::HttpStatus {
                status: response.status,
                url: format!("{}/{}", self.remote.service(), isbn),
            })
        }
    }
}
