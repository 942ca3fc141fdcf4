use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use kbase_core::error::CounterStoreError;
use kbase_core::traits::CounterStore;

/// Counters persisted as one JSON object (`{"<id>": <count>}`).
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new map. Meant for a single
/// process at a time.
#[derive(Debug)]
pub struct FileCounterStore {
    path: PathBuf,
    counts: Mutex<HashMap<String, u64>>,
}

impl FileCounterStore {
    /// Loads existing counters from `path`; a missing file starts empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CounterStoreError> {
        let path = path.as_ref().to_path_buf();
        let counts = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => HashMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| CounterStoreError::Corrupt { key: path.display().to_string(), reason: e.to_string() })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(CounterStoreError::Unreachable(format!("{}: {e}", path.display()))),
        };
        info!(path = %path.display(), counters = counts.len(), "opened counter file");
        Ok(Self { path, counts: Mutex::new(counts) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn counts(&self) -> Result<MutexGuard<'_, HashMap<String, u64>>, CounterStoreError> {
        self.counts.lock().map_err(|_| CounterStoreError::Unreachable("counter map lock poisoned".to_string()))
    }

    fn persist(&self, counts: &HashMap<String, u64>) -> Result<(), CounterStoreError> {
        let io_error = |e: std::io::Error| CounterStoreError::Unreachable(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let raw = serde_json::to_string(counts).map_err(|e| CounterStoreError::Unreachable(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(io_error)?;
        fs::rename(&tmp, &self.path).map_err(io_error)?;
        debug!(path = %self.path.display(), counters = counts.len(), "persisted counters");
        Ok(())
    }
}

impl CounterStore for FileCounterStore {
    fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> {
        Ok(self.counts()?.get(key).copied())
    }

    fn set(&self, key: &str, value: u64) -> Result<(), CounterStoreError> {
        let mut counts = self.counts()?;
        counts.insert(key.to_string(), value);
        self.persist(&counts)
    }

    fn incr(&self, key: &str) -> Result<u64, CounterStoreError> {
        let mut counts = self.counts()?;
        let current = counts.get(key).copied().unwrap_or(0);
        let next = current.checked_add(1).ok_or_else(|| CounterStoreError::Corrupt { key: key.to_string(), reason: "increment would overflow".to_string() })?;
        counts.insert(key.to_string(), next);
        self.persist(&counts)?;
        Ok(next)
    }

    fn delete(&self, key: &str) -> Result<bool, CounterStoreError> {
        let mut counts = self.counts()?;
        if counts.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&counts)?;
        Ok(true)
    }
}
