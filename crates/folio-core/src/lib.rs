//! folio core - enrich book datasets with descriptions and themes.
//!
//! The centre of the crate is a fetch-and-cache [`Pipeline`]: for every ISBN
//! it either returns a cached outcome or fetches the book page with bounded
//! retries, and persists each new outcome to a durable cache before moving on.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::{CacheStore, Dataset, HttpClient, Pipeline, PipelineConfig};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> folio_core::Result<()> {
//!     let dataset = Dataset::load("dataset.csv", "ISBN")?;
//!     let cache = CacheStore::open("isbn_cache.json")?;
//!     let remote = Arc::new(HttpClient::new()?);
//!
//!     let mut pipeline = Pipeline::new(cache, remote, PipelineConfig::default())?;
//!     let mut outcomes = HashMap::new();
//!     let report = pipeline
//!         .run(dataset.identifiers(), |done| {
//!             outcomes.insert(done.isbn.clone(), done.outcome.clone());
//!         })
//!         .await?;
//!
//!     dataset.write_enriched("dataset_with_details.csv", &outcomes)?;
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cancel;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetcher;
pub mod identifier;
pub mod network;
pub mod outcome;
pub mod parser;
pub mod pipeline;

// Re-export commonly used types
pub use cache::{CachePreview, CacheStore};
pub use cancel::CancellationToken;
pub use config::{CacheConfig, NetworkConfig, PipelineConfig, RateLimitPolicy, ScrapeConfig};
pub use dataset::Dataset;
pub use error::{FolioError, Result};
pub use fetcher::Fetcher;
pub use identifier::{Isbn, IsbnBatch};
pub use network::{DelayRange, HttpClient, Remote, RemoteResponse, RetryConfig};
pub use outcome::{BookDetails, FetchOutcome, OutcomeKind, OutcomeSummary};
pub use parser::DetailsParser;
pub use pipeline::{Completed, Origin, Pipeline, PipelineReport};
