use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use kbase_core::error::CounterStoreError;
use kbase_core::traits::CounterStore;

/// Process-local counters behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counts: Mutex<HashMap<String, u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counts().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn counts(&self) -> Result<MutexGuard<'_, HashMap<String, u64>>, CounterStoreError> {
        self.counts.lock().map_err(|_| CounterStoreError::Unreachable("counter map lock poisoned".to_string()))
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> {
        Ok(self.counts()?.get(key).copied())
    }

    fn set(&self, key: &str, value: u64) -> Result<(), CounterStoreError> {
        self.counts()?.insert(key.to_string(), value);
        Ok(())
    }

    fn incr(&self, key: &str) -> Result<u64, CounterStoreError> {
        let mut counts = self.counts()?;
        let count = counts.entry(key.to_string()).or_insert(0);
        *count = count.checked_add(1).ok_or_else(|| CounterStoreError::Corrupt { key: key.to_string(), reason: "increment would overflow".to_string() })?;
        Ok(*count)
    }

    fn delete(&self, key: &str) -> Result<bool, CounterStoreError> {
        Ok(self.counts()?.remove(key).is_some())
    }
}
