//! Durable identifier → outcome cache.
//!
//! The whole snapshot is loaded once, mutated in memory and rewritten
//! wholesale after every new entry. Only one owner mutates a `CacheStore`;
//! the pipeline funnels all worker results through its run loop for that.

use super::atomic::{read_json, write_json_atomic};
use crate::config::CacheConfig;
use crate::identifier::Isbn;
use crate::outcome::{FetchOutcome, OutcomeKind, OutcomeSummary};
use crate::{FolioError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk layout of the cache file.
#[derive(Debug, Deserialize)]
struct CacheFile {
    version: u32,
    updated_at: DateTime<Utc>,
    entries: BTreeMap<Isbn, FetchOutcome>,
}

/// Borrowed form of [`CacheFile`] used when writing.
#[derive(Debug, Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    updated_at: DateTime<Utc>,
    entries: &'a BTreeMap<Isbn, FetchOutcome>,
}

/// Only the version is read first, so an unknown schema is reported as such
/// instead of as a parse error.
#[derive(Debug, Deserialize)]
struct CacheHeader {
    version: u32,
}

/// In-memory cache backed by a JSON snapshot file.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<Isbn, FetchOutcome>,
}

impl CacheStore {
    /// Load the snapshot at `path`, or start empty if there is none.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match load_snapshot(&path)? {
            Some(file) => file.entries,
            None => {
                debug!("No cache at {}, starting empty", path.display());
                BTreeMap::new()
            }
        };

        info!("Loaded {} cached entries from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, isbn: &Isbn) -> Option<&FetchOutcome> {
        self.entries.get(isbn)
    }

    pub fn contains(&self, isbn: &Isbn) -> bool {
        self.entries.contains_key(isbn)
    }

    /// Insert or replace an entry in memory. Call [`flush`](Self::flush) to persist.
    pub fn insert(&mut self, isbn: Isbn, outcome: FetchOutcome) -> Option<FetchOutcome> {
        self.entries.insert(isbn, outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&Isbn, &FetchOutcome)> {
        self.entries.iter()
    }

    /// Drop `Failed` entries so the next run fetches them again.
    pub fn remove_failed(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, outcome| outcome.kind() != OutcomeKind::Failed);
        before - self.entries.len()
    }

    pub fn summary(&self) -> OutcomeSummary {
        summarize(&self.entries)
    }

    /// Rewrite the snapshot file with the current contents.
    pub fn flush(&self) -> Result<()> {
        let file = CacheFileRef {
            version: CacheConfig::SCHEMA_VERSION,
            updated_at: Utc::now(),
            entries: &self.entries,
        };
        write_json_atomic(&self.path, &file)
    }

    /// Read-only preview of the cache file at `path`.
    ///
    /// Returns `None` if there is no cache file. Never writes.
    pub fn inspect(path: &Path, limit: usize) -> Result<Option<CachePreview>> {
        let Some(file) = load_snapshot(path)? else {
            return Ok(None);
        };

        let summary = summarize(&file.entries);
        let entries = file
            .entries
            .iter()
            .take(limit)
            .map(|(isbn, outcome)| {
                let details = outcome.details();
                PreviewEntry {
                    isbn: isbn.clone(),
                    kind: outcome.kind(),
                    description: truncate_chars(
                        &details.description,
                        CacheConfig::PREVIEW_DESCRIPTION_CHARS,
                    ),
                    themes: details.themes,
                }
            })
            .collect();

        Ok(Some(CachePreview {
            total: file.entries.len(),
            updated_at: file.updated_at,
            summary,
            entries,
        }))
    }
}

fn load_snapshot(path: &Path) -> Result<Option<CacheFile>> {
    let Some(raw) = read_json::<serde_json::Value>(path)? else {
        return Ok(None);
    };

    let header: CacheHeader = serde_json::from_value(raw.clone()).map_err(|e| FolioError::Json {
        message: format!("{} is not a cache file: {}", path.display(), e),
        source: Some(e),
    })?;
    if header.version != CacheConfig::SCHEMA_VERSION {
        return Err(FolioError::CacheSchema {
            found: header.version,
            expected: CacheConfig::SCHEMA_VERSION,
        });
    }

    let file = serde_json::from_value(raw).map_err(|e| FolioError::Json {
        message: format!("Failed to parse cache {}: {}", path.display(), e),
        source: Some(e),
    })?;
    Ok(Some(file))
}

fn summarize(entries: &BTreeMap<Isbn, FetchOutcome>) -> OutcomeSummary {
    let mut summary = OutcomeSummary::default();
    for outcome in entries.values() {
        summary.record(outcome);
    }
    summary
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// One entry of a [`CachePreview`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    pub isbn: Isbn,
    pub kind: OutcomeKind,
    pub description: String,
    pub themes: String,
}

/// Summary of a cache file for the inspection command.
#[derive(Debug, Clone)]
pub struct CachePreview {
    pub total: usize,
    pub updated_at: DateTime<Utc>,
    pub summary: OutcomeSummary,
    pub entries: Vec<PreviewEntry>,
}

impl fmt::Display for CachePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ISBNs cached ({}), last updated {}",
            self.total,
            self.summary,
            self.updated_at.to_rfc3339()
        )?;
        if self.entries.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "Preview of cached data:")?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "{}. ISBN: {} [{}]", i + 1, entry.isbn, entry.kind)?;
            writeln!(f, "   Description: {}", entry.description)?;
            writeln!(f, "   Themes: {}", entry.themes)?;
        }
        Ok(())
    }
}
