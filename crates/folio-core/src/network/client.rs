//! HTTP client for book detail pages.
//!
//! Wraps one pooled `reqwest::Client` with a default user agent and request
//! timeout, and builds `{base_url}/{isbn}` URLs.

use crate::config::NetworkConfig;
use crate::identifier::Isbn;
use crate::network::remote::{Remote, RemoteResponse};
use crate::{FolioError, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// HTTP client used by the pipeline in production.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client for the default Open Library endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(NetworkConfig::DEFAULT_BASE_URL, NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a client for a custom base URL and request timeout.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url).map_err(|e| FolioError::Validation {
            field: "base_url".into(),
            message: format!("{}: {}", base_url, e),
        })?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("text/html,application/xhtml+xml"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| FolioError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// URL of the detail page for `isbn`.
    pub fn url_for(&self, isbn: &Isbn) -> String {
        format!("{}/{}", self.base_url, isbn)
    }
}

#[async_trait]
impl Remote for HttpClient {
    async fn fetch(&self, isbn: &Isbn) -> Result<RemoteResponse> {
        let url = self.url_for(isbn);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FolioError::Timeout(self.timeout)
            } else {
                FolioError::Network {
                    message: format!("GET {} failed: {}", url, e),
                    source: Some(e),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| FolioError::Network {
            message: format!("Reading body of {} failed: {}", url, e),
            source: Some(e),
        })?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(RemoteResponse { status, body })
    }

    fn service(&self) -> String {
        extract_domain(&self.base_url)
    }
}

/// Extract domain from a URL.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
