//! Error types for folio.
//!
//! Per-identifier failures (network, timeouts, unexpected statuses, throttling) are
//! contained by the fetcher and turned into outcomes. Persistence and setup errors
//! abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the folio library.
#[derive(Debug, Error)]
pub enum FolioError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Rate limited by {service}")]
    RateLimited { service: String },

    #[error("Not found: {isbn}")]
    NotFound { isbn: String },

    // Cache errors
    #[error("Failed to persist cache at {path}: {message}")]
    Persistence {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Unsupported cache schema version {found} (expected {expected})")]
    CacheSchema { found: u32, expected: u32 },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Dataset errors
    #[error("Dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("Column '{column}' missing from dataset (available: {available:?})")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("CSV error in {path}: {message}")]
    Csv {
        message: String,
        path: PathBuf,
        #[source]
        source: Option<csv::Error>,
    },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, FolioError>;

impl From<std::io::Error> for FolioError {
    fn from(err: std::io::Error) -> Self {
        FolioError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl FolioError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        FolioError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a persistence error for the cache file at `path`.
    pub fn persistence(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: Option<std::io::Error>,
    ) -> Self {
        FolioError::Persistence {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Check if this error should trigger an exponential-backoff retry.
    ///
    /// Rate limiting is deliberately excluded: it has its own delay path and
    /// does not consume the backoff budget.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FolioError::Network { .. } | FolioError::Timeout(_) | FolioError::HttpStatus { .. }
        )
    }
}
