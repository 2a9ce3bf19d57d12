//! Network utilities: the remote boundary, the HTTP client and retry policy.
//!
//! This module provides:
//! - The `Remote` trait the pipeline fetches through
//! - A reqwest-backed `HttpClient` implementing it
//! - Retry logic with exponential backoff and additive jitter
//! - Randomized delay ranges for rate-limit and politeness pauses

mod client;
mod remote;
mod retry;

pub use client::{extract_domain, HttpClient};
pub use remote::{Remote, RemoteResponse};
pub use retry::{retry_async, DelayRange, RetryConfig, RetryStats};
