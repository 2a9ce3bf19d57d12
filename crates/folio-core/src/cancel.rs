//! Cancellation token shared between the pipeline and its caller.
//!
//! Cancellation is cooperative: workers check the token before taking the next
//! identifier, so an in-flight fetch always finishes and gets persisted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation token for cooperative cancellation of a pipeline run.
///
/// Clones share state. When `cancel()` is called on any clone, all clones
/// observe the cancellation.
///
/// # Example
///
/// ```
/// use folio_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let for_signal_handler = token.clone();
///
/// for_signal_handler.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
