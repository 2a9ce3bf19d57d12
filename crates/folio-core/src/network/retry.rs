//! Retry logic with exponential backoff and jitter.
//!
//! The delay before retry `n` (0-indexed) is `base * exponential_base^n` plus a
//! uniformly random jitter in `[0, jitter)`, capped at `max_delay`.

use crate::config::NetworkConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Exponential base (typically 2.0 for doubling).
    pub exponential_base: f64,
    /// Upper bound of the random delay added to each backoff.
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: NetworkConfig::MAX_ATTEMPTS,
            base_delay: NetworkConfig::BACKOFF_BASE_DELAY,
            max_delay: NetworkConfig::BACKOFF_MAX_DELAY,
            exponential_base: 2.0,
            jitter: NetworkConfig::BACKOFF_MAX_JITTER,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter bound; `Duration::ZERO` disables jitter.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.exponential_base.powi(attempt as i32);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;

        let jitter_secs = if self.jitter.is_zero() {
            0.0
        } else {
            rand::rng().random_range(0.0..self.jitter.as_secs_f64())
        };

        let final_secs = (delay_secs + jitter_secs).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(final_secs)
    }
}

/// A closed interval of durations to sleep for, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    /// Create a range; bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that never sleeps.
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::rng().random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Sleep for a sampled duration and return how long that was.
    pub async fn sleep(&self) -> Duration {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        delay
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Retry an async operation with exponential backoff.
///
/// `should_retry` decides whether an error is worth another attempt; a
/// non-retryable error is returned after the attempt that produced it.
/// Callers must ensure `config.max_attempts >= 1`.
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut stats = RetryStats::default();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        stats.attempts = attempt + 1;

        match operation().await {
            Ok(value) => {
                stats.success = true;
                if attempt > 0 {
                    debug!("Operation succeeded after {} attempts", attempt + 1);
                }
                return (Ok(value), stats);
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());

                if !should_retry(&e) {
                    debug!("Error is not retryable: {}", e);
                    return (Err(e), stats);
                }

                if attempt + 1 >= max_attempts {
                    warn!(
                        "All {} retry attempts exhausted. Last error: {}",
                        max_attempts, e
                    );
                    return (Err(e), stats);
                }

                let delay = config.calculate_delay(attempt);
                stats.total_delay += delay;

                warn!(
                    "Retry {}/{} after {:.2?} due to error: {}",
                    attempt + 1,
                    max_attempts,
                    delay,
                    e
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
