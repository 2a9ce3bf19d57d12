//! The boundary between the pipeline and whatever serves book pages.

use crate::identifier::Isbn;
use crate::Result;
use async_trait::async_trait;

/// Status code and body of one remote response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// A source of book detail pages.
///
/// `Err` means the request never produced a status (timeout, connection
/// failure). Any HTTP status, including errors, comes back as `Ok`.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn fetch(&self, isbn: &Isbn) -> Result<RemoteResponse>;

    /// Name used in log lines, e.g. the remote host.
    fn service(&self) -> String {
        "remote".to_string()
    }
}
