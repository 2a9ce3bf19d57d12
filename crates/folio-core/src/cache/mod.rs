//! Durable cache of fetch outcomes.
//!
//! A single JSON snapshot file holds every identifier fetched so far. It is
//! loaded once per run and rewritten atomically after each new entry.

mod atomic;
mod store;

pub use atomic::{read_json, write_json_atomic};
pub use store::{CachePreview, CacheStore, PreviewEntry};
