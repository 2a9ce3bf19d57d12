//! Atomic file operations for the JSON cache snapshot.
//!
//! Writes go to a temp file with a unique PID+TID suffix in the target's
//! directory, are fsynced, then renamed over the target. A reader never sees a
//! half-written snapshot.

use crate::{FolioError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::debug;

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(FolioError::io_with_path(e, path)),
    };

    let data = serde_json::from_reader(BufReader::new(file)).map_err(|e| FolioError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically.
///
/// Every failure is reported as [`FolioError::Persistence`]; the previous
/// snapshot at `path` is left untouched in that case.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                FolioError::persistence(
                    format!("failed to create directory {}", parent.display()),
                    path,
                    Some(e),
                )
            })?;
        }
    }

    let serialized = serde_json::to_vec(data).map_err(|e| {
        FolioError::persistence(format!("failed to serialize snapshot: {}", e), path, None)
    })?;

    let temp_path = temp_path_for(path);
    if let Err(e) = write_synced(&temp_path, &serialized) {
        let _ = fs::remove_file(&temp_path);
        return Err(FolioError::persistence(
            format!("failed to write temp file {}", temp_path.display()),
            path,
            Some(e),
        ));
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(FolioError::persistence(
            format!("failed to rename {} into place", temp_path.display()),
            path,
            Some(e),
        ));
    }

    debug!("Atomically wrote {} ({} bytes)", path.display(), serialized.len());
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

/// Temp file next to `path`, unique per process and thread.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cache".to_string());
    path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        process::id(),
        thread_id()
    ))
}

/// Get a unique thread identifier.
fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}
