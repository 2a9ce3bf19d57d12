//! Fetch-and-cache pipeline.
//!
//! Cached identifiers short-circuit without a network call. The rest are
//! drained from a shared queue by a small pool of worker tasks. Workers never
//! touch the cache: each sends its outcome to the run loop, which owns the
//! [`CacheStore`], inserts the entry, flushes the snapshot and only then lets
//! the worker take its next identifier.

use crate::cache::CacheStore;
use crate::config::PipelineConfig;
use crate::fetcher::Fetcher;
use crate::identifier::{Isbn, IsbnBatch};
use crate::network::Remote;
use crate::outcome::{FetchOutcome, OutcomeSummary};
use crate::{FolioError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Where a completed outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Remote,
}

/// One finished identifier, as handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub isbn: Isbn,
    pub outcome: FetchOutcome,
    pub origin: Origin,
}

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Identifiers in the batch.
    pub total: usize,
    /// Served from the cache without a network call.
    pub cached: usize,
    /// Fetched from the remote and persisted.
    pub fetched: usize,
    /// Never started because the run was cancelled.
    pub skipped: usize,
    pub summary: OutcomeSummary,
}

/// Message from a worker to the cache owner.
struct WorkerResult {
    isbn: Isbn,
    outcome: FetchOutcome,
    persisted: oneshot::Sender<()>,
}

type WorkQueue = Arc<Mutex<VecDeque<Isbn>>>;

/// Runs batches of identifiers through the cache and the remote.
pub struct Pipeline {
    cache: CacheStore,
    fetcher: Arc<Fetcher>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(cache: CacheStore, remote: Arc<dyn Remote>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = Arc::new(Fetcher::new(remote, &config));
        Ok(Self {
            cache,
            fetcher,
            config,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Produce exactly one outcome per identifier in `batch`.
    ///
    /// `on_complete` sees every identifier once, in completion order. Only a
    /// cache persistence failure aborts the run.
    pub async fn run<F>(&mut self, batch: IsbnBatch, mut on_complete: F) -> Result<PipelineReport>
    where
        F: FnMut(&Completed),
    {
        let mut report = PipelineReport {
            total: batch.len(),
            ..Default::default()
        };
        let mut done = 0usize;

        let mut pending = VecDeque::new();
        for isbn in batch.into_vec() {
            match self.cache.get(&isbn) {
                Some(outcome) => {
                    debug!("Cache hit for ISBN {}", isbn);
                    let completed = Completed {
                        isbn,
                        outcome: outcome.clone(),
                        origin: Origin::Cache,
                    };
                    done += 1;
                    report.cached += 1;
                    report.summary.record(&completed.outcome);
                    on_complete(&completed);
                }
                None => pending.push_back(isbn),
            }
        }

        if pending.is_empty() {
            info!("All {} ISBNs already cached", report.total);
            return Ok(report);
        }

        let worker_count = self.config.workers.min(pending.len());
        info!(
            "Fetching {} ISBNs with {} workers ({} cached)",
            pending.len(),
            worker_count,
            report.cached
        );

        let queue: WorkQueue = Arc::new(Mutex::new(pending));
        let (tx, mut rx) = mpsc::channel::<WorkerResult>(worker_count);
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(worker_loop(
                worker_id,
                queue.clone(),
                self.fetcher.clone(),
                tx.clone(),
                self.config.cancellation.clone(),
            ));
        }
        drop(tx);

        while let Some(result) = rx.recv().await {
            let WorkerResult {
                isbn,
                outcome,
                persisted,
            } = result;

            self.cache.insert(isbn.clone(), outcome.clone());
            if let Err(e) = self.cache.flush() {
                error!("Cache write failed, aborting run: {}", e);
                workers.abort_all();
                return Err(e);
            }
            let _ = persisted.send(());

            done += 1;
            report.fetched += 1;
            report.summary.record(&outcome);
            info!("[{}/{}] {} -> {}", done, report.total, isbn, outcome.kind());

            on_complete(&Completed {
                isbn,
                outcome,
                origin: Origin::Remote,
            });
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| FolioError::Other(format!("Fetch worker panicked: {}", e)))?;
        }

        report.skipped = remaining(&queue);
        if report.skipped > 0 {
            warn!("Run cancelled, {} ISBNs not attempted", report.skipped);
        }

        Ok(report)
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: WorkQueue,
    fetcher: Arc<Fetcher>,
    results: mpsc::Sender<WorkerResult>,
    cancellation: crate::cancel::CancellationToken,
) {
    loop {
        if cancellation.is_cancelled() {
            debug!("Worker {} stopping: cancelled", worker_id);
            return;
        }

        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(isbn) = next else {
            return;
        };

        let outcome = fetcher.fetch(&isbn).await;

        let (persisted_tx, persisted_rx) = oneshot::channel();
        let message = WorkerResult {
            isbn,
            outcome,
            persisted: persisted_tx,
        };
        if results.send(message).await.is_err() || persisted_rx.await.is_err() {
            // The run loop is gone; nothing more can be persisted.
            return;
        }
    }
}

/// Identifiers still queued. A poisoned lock still reports its contents.
fn remaining(queue: &WorkQueue) -> usize {
    queue.lock().unwrap_or_else(PoisonError::into_inner).len()
}
