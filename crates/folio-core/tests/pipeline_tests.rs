//! Integration tests for the fetch-and-cache pipeline.
//!
//! A scripted in-memory remote stands in for the network; tokio's paused
//! clock makes backoff and rate-limit sleeps instantaneous.

use async_trait::async_trait;
use folio_core::{
    BookDetails, CacheStore, CancellationToken, Completed, DelayRange, FetchOutcome, FolioError,
    Isbn, IsbnBatch, Origin, Pipeline, PipelineConfig, Remote, RemoteResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Per-ISBN scripted responses; the last scripted step repeats forever.
#[derive(Default)]
struct FakeRemote {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: Mutex<Vec<String>>,
    overlap_detected: Mutex<bool>,
}

#[derive(Clone)]
enum Step {
    Status(u16, String),
    Timeout,
}

impl FakeRemote {
    fn new() -> Self {
        Self::default()
    }

    fn script(self, isbn: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(isbn.to_string(), steps.into());
        self
    }

    fn calls(&self, isbn: &str) -> u32 {
        self.calls.lock().unwrap().get(isbn).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_step(&self, isbn: &str) -> Step {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(isbn) {
            Some(steps) if steps.len() > 1 => steps.pop_front().unwrap(),
            Some(steps) => steps.front().cloned().unwrap(),
            None => Step::Status(200, page(&format!("About {}", isbn), "General")),
        }
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn fetch(&self, isbn: &Isbn) -> folio_core::Result<RemoteResponse> {
        let key = isbn.as_str().to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if in_flight.contains(&key) {
                *self.overlap_detected.lock().unwrap() = true;
            }
            in_flight.push(key.clone());
        }
        // Let other workers interleave.
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.lock().unwrap().retain(|k| k != &key);

        match self.next_step(&key) {
            Step::Status(status, body) => Ok(RemoteResponse::new(status, body)),
            Step::Timeout => Err(FolioError::Timeout(Duration::from_secs(20))),
        }
    }
}

fn page(description: &str, theme: &str) -> String {
    format!(
        r#"<html><body>
             <div class="read-more__content"><p>{}</p></div>
             <div class="section link-box"><a href="/s">{}</a></div>
           </body></html>"#,
        description, theme
    )
}

fn isbn(raw: &str) -> Isbn {
    Isbn::parse(raw).unwrap()
}

fn batch(raw: &[&str]) -> IsbnBatch {
    IsbnBatch::parse(raw.iter().copied()).unwrap()
}

fn cache_in(dir: &TempDir) -> CacheStore {
    CacheStore::open(dir.path().join("isbn_cache.json")).unwrap()
}

async fn run_collect(
    pipeline: &mut Pipeline,
    ids: IsbnBatch,
) -> folio_core::Result<(Vec<Completed>, folio_core::PipelineReport)> {
    let mut completed = Vec::new();
    let report = pipeline.run(ids, |c| completed.push(c.clone())).await?;
    Ok((completed, report))
}

#[tokio::test(start_paused = true)]
async fn test_cached_identifier_needs_no_fetch() {
    let tmp = TempDir::new().unwrap();
    let mut cache = cache_in(&tmp);
    cache.insert(
        isbn("000000000X"),
        FetchOutcome::success(BookDetails::new("A tale...", "fiction, classic")),
    );
    cache.flush().unwrap();

    let remote = Arc::new(FakeRemote::new());
    let mut pipeline = Pipeline::new(
        CacheStore::open(tmp.path().join("isbn_cache.json")).unwrap(),
        remote.clone(),
        PipelineConfig::default(),
    )
    .unwrap();

    let (completed, report) = run_collect(&mut pipeline, batch(&["000000000X"]))
        .await
        .unwrap();

    assert_eq!(remote.total_calls(), 0);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].origin, Origin::Cache);
    assert_eq!(
        completed[0].outcome.details(),
        BookDetails::new("A tale...", "fiction, classic")
    );
    assert_eq!(report.cached, 1);
    assert_eq!(report.fetched, 0);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_cached_with_sentinels() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().script("111", vec![Step::Status(404, String::new())]));
    let mut pipeline =
        Pipeline::new(cache_in(&tmp), remote.clone(), PipelineConfig::default()).unwrap();

    let (completed, report) = run_collect(&mut pipeline, batch(&["111"])).await.unwrap();

    assert_eq!(remote.calls("111"), 1);
    assert_eq!(completed[0].outcome, FetchOutcome::NotFound);
    assert_eq!(
        completed[0].outcome.details(),
        BookDetails::new("No description available", "No themes available")
    );
    assert_eq!(report.summary.not_found, 1);

    let reopened = CacheStore::open(tmp.path().join("isbn_cache.json")).unwrap();
    assert_eq!(reopened.get(&isbn("111")), Some(&FetchOutcome::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_then_success() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().script(
        "222",
        vec![
            Step::Status(429, String::new()),
            Step::Status(200, page("Second time lucky", "Luck")),
        ],
    ));
    let config = PipelineConfig::default().with_politeness(DelayRange::none());
    let mut pipeline = Pipeline::new(cache_in(&tmp), remote.clone(), config).unwrap();

    let start = tokio::time::Instant::now();
    let (completed, _) = run_collect(&mut pipeline, batch(&["222"])).await.unwrap();

    assert_eq!(remote.calls("222"), 2);
    assert_eq!(
        completed[0].outcome,
        FetchOutcome::success(BookDetails::new("Second time lucky", "Luck"))
    );
    // The rate-limit pause is at least 5s.
    assert!(start.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_persistent_timeouts_fail_after_five_attempts() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(FakeRemote::new().script("333", vec![Step::Timeout]));
    let mut pipeline =
        Pipeline::new(cache_in(&tmp), remote.clone(), PipelineConfig::default()).unwrap();

    let (completed, report) = run_collect(&mut pipeline, batch(&["333"])).await.unwrap();

    assert_eq!(remote.calls("333"), 5);
    assert_eq!(completed[0].outcome, FetchOutcome::Failed);
    assert_eq!(report.summary.failed, 1);

    let reopened = CacheStore::open(tmp.path().join("isbn_cache.json")).unwrap();
    assert_eq!(
        reopened.get(&isbn("333")).unwrap().details(),
        BookDetails::new("Error: Failed after multiple retries", "No themes available")
    );
}

#[tokio::test(start_paused = true)]
async fn test_every_identifier_gets_exactly_one_outcome() {
    let tmp = TempDir::new().unwrap();
    let remote = Arc::new(
        FakeRemote::new()
            .script("b", vec![Step::Status(404, String::new())])
            .script("d", vec![Step::Timeout])
            .script("f", vec![Step::Timeout, Step::Status(200, page("F", "f"))]),
    );

    // Pre-cache one identifier to mix both origins.
    let mut cache = cache_in(&tmp);
    cache.insert(isbn("a"), FetchOutcome::NotFound);

    let ids = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
    let mut pipeline = Pipeline::new(cache, remote.clone(), PipelineConfig::default()).unwrap();
    let (completed, report) = run_collect(&mut pipeline, batch(&ids)).await.unwrap();

    let mut seen: Vec<&str> = completed.iter().map(|c| c.isbn.as_str()).collect();
    seen.sort();
    assert_eq!(seen, ids.to_vec());

    assert_eq!(report.total, 10);
    assert_eq!(report.cached, 1);
    assert_eq!(report.fetched, 9);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.summary.total(), 10);
    assert_eq!(remote.calls("a"), 0);
    assert!(!*remote.overlap_detected.lock().unwrap());
    assert_eq!(pipeline.cache().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_second_run_converges_without_fetching() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("isbn_cache.json");
    let remote = Arc::new(
        FakeRemote::new()
            .script("1", vec![Step::Status(404, String::new())])
            .script("2", vec![Step::Timeout]),
    );
    let ids = ["1", "2", "3", "4"];

    let mut first = Pipeline::new(
        CacheStore::open(&path).unwrap(),
        remote.clone(),
        PipelineConfig::default(),
    )
    .unwrap();
    first.run(batch(&ids), |_| {}).await.unwrap();
    let after_first: Vec<_> = first
        .cache()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let calls_after_first = remote.total_calls();

    let mut second = Pipeline::new(
        CacheStore::open(&path).unwrap(),
        remote.clone(),
        PipelineConfig::default(),
    )
    .unwrap();
    let report = second.run(batch(&ids), |_| {}).await.unwrap();
    let after_second: Vec<_> = second
        .cache()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    assert_eq!(after_first, after_second);
    assert_eq!(remote.total_calls(), calls_after_first);
    assert_eq!(report.cached, 4);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_is_complete_after_each_entry() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("isbn_cache.json");
    let remote = Arc::new(FakeRemote::new());
    let config = PipelineConfig::default().with_workers(1);
    let mut pipeline = Pipeline::new(CacheStore::open(&path).unwrap(), remote, config).unwrap();

    let mut sizes_on_disk = Vec::new();
    let mut seen = Vec::new();
    pipeline
        .run(batch(&["k1", "k2", "k3", "k4"]), |c| {
            seen.push(c.isbn.clone());
            let on_disk = CacheStore::open(&path).unwrap();
            for earlier in &seen {
                assert!(on_disk.contains(earlier), "{} missing on disk", earlier);
            }
            sizes_on_disk.push(on_disk.len());
        })
        .await
        .unwrap();

    assert_eq!(sizes_on_disk, vec![1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_stray_temp_file_does_not_corrupt_cache() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("isbn_cache.json");

    let mut cache = CacheStore::open(&path).unwrap();
    cache.insert(isbn("k1"), FetchOutcome::NotFound);
    cache.flush().unwrap();

    // A crash mid-write leaves a truncated temp file beside the snapshot.
    std::fs::write(
        tmp.path().join(".isbn_cache.json.999.1.tmp"),
        br#"{"version":1,"entries":{"k2""#,
    )
    .unwrap();

    let reopened = CacheStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(reopened.contains(&isbn("k1")));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_new_work_but_keeps_in_flight() {
    let tmp = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let remote = Arc::new(FakeRemote::new());
    let config = PipelineConfig::default()
        .with_workers(1)
        .with_cancellation(token.clone());
    let mut pipeline = Pipeline::new(cache_in(&tmp), remote.clone(), config).unwrap();

    let mut completed = Vec::new();
    let report = pipeline
        .run(batch(&["x1", "x2", "x3", "x4"]), |c| {
            completed.push(c.isbn.clone());
            token.cancel();
        })
        .await
        .unwrap();

    // The single worker finishes its current item, then stops.
    assert_eq!(completed, vec![isbn("x1")]);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.skipped, 3);
    assert_eq!(remote.total_calls(), 1);

    let reopened = CacheStore::open(tmp.path().join("isbn_cache.json")).unwrap();
    assert_eq!(reopened.len(), 1);
    assert!(!reopened.contains(&isbn("x2")));
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failure_aborts_run() {
    let tmp = TempDir::new().unwrap();
    let cache_dir = tmp.path().join("cache");
    let cache = CacheStore::open(cache_dir.join("isbn_cache.json")).unwrap();
    // The cache directory turns out to be a regular file when the first flush happens.
    std::fs::write(&cache_dir, b"file").unwrap();

    let mut pipeline =
        Pipeline::new(cache, Arc::new(FakeRemote::new()), PipelineConfig::default()).unwrap();

    let result = pipeline.run(batch(&["p1", "p2", "p3"]), |_| {}).await;
    assert!(matches!(result, Err(FolioError::Persistence { .. })));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let result = Pipeline::new(
        cache_in(&tmp),
        Arc::new(FakeRemote::new()),
        PipelineConfig::default().with_workers(0),
    );
    assert!(matches!(result, Err(FolioError::Validation { .. })));
}
