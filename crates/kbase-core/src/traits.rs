use serde_json::Value;

use crate::error::{CounterStoreError, EngineError};
use crate::types::{
    Article, BulkOp, BulkResponse, DeleteResponse, EngineHit, IndexResponse, Refresh, TextQuery,
};

/// Client for a full-text document store.
pub trait SearchEngine: Send + Sync {
    fn create_index(&self, index: &str, settings: &Value) -> Result<(), EngineError>;
    fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError>;
    fn query(&self, index: &str, query: &TextQuery) -> Result<Vec<EngineHit>, EngineError>;
    fn get(&self, index: &str, id: &str) -> Result<Article, EngineError>;
    /// Create-or-update. Without an `id` the engine assigns one.
    fn index(
        &self,
        index: &str,
        id: Option<&str>,
        article: &Article,
        refresh: Refresh,
    ) -> Result<IndexResponse, EngineError>;
    /// A missing document is a normal `found: false` response, not an error.
    fn delete(&self, index: &str, id: &str, refresh: Refresh) -> Result<DeleteResponse, EngineError>;
    fn bulk(&self, index: &str, ops: &[BulkOp], refresh: Refresh) -> Result<BulkResponse, EngineError>;
    /// Make all pending writes visible to search.
    fn refresh(&self, index: &str) -> Result<(), EngineError>;
}

/// Client for an integer counter store with atomic increments.
pub trait CounterStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError>;
    fn set(&self, key: &str, value: u64) -> Result<(), CounterStoreError>;
    /// Atomically add one, creating the key at 1 when absent.
    fn incr(&self, key: &str) -> Result<u64, CounterStoreError>;
    /// Returns whether a key was removed.
    fn delete(&self, key: &str) -> Result<bool, CounterStoreError>;
}

impl<T: SearchEngine + ?Sized> SearchEngine for Box<T> {
    fn create_index(&self, index: &str, settings: &Value) -> Result<(), EngineError> {
        (**self).create_index(index, settings)
    }
    fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError> {
        (**self).put_mapping(index, mapping)
    }
    fn query(&self, index: &str, query: &TextQuery) -> Result<Vec<EngineHit>, EngineError> {
        (**self).query(index, query)
    }
    fn get(&self, index: &str, id: &str) -> Result<Article, EngineError> {
        (**self).get(index, id)
    }
    fn index(&self, index: &str, id: Option<&str>, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
        (**self).index(index, id, article, refresh)
    }
    fn delete(&self, index: &str, id: &str, refresh: Refresh) -> Result<DeleteResponse, EngineError> {
        (**self).delete(index, id, refresh)
    }
    fn bulk(&self, index: &str, ops: &[BulkOp], refresh: Refresh) -> Result<BulkResponse, EngineError> {
        (**self).bulk(index, ops, refresh)
    }
    fn refresh(&self, index: &str) -> Result<(), EngineError> {
        (**self).refresh(index)
    }
}

impl<T: CounterStore + ?Sized> CounterStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> { (**self).get(key) }
    fn set(&self, key: &str, value: u64) -> Result<(), CounterStoreError> { (**self).set(key, value) }
    fn incr(&self, key: &str) -> Result<u64, CounterStoreError> { (**self).incr(key) }
    fn delete(&self, key: &str) -> Result<bool, CounterStoreError> { (**self).delete(key) }
}
