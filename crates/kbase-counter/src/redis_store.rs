use std::sync::{Mutex, MutexGuard};

use redis::{Commands, Connection, ErrorKind, RedisError};
use tracing::{debug, info};

use kbase_core::error::CounterStoreError;
use kbase_core::traits::CounterStore;

/// Counters kept in Redis with `GET`/`SET`/`INCR`/`DEL`, one key per article
/// id, optionally namespaced by a prefix.
pub struct RedisCounterStore {
    conn: Mutex<Connection>,
    key_prefix: String,
}

impl RedisCounterStore {
    pub fn connect(url: &str, key_prefix: &str) -> Result<Self, CounterStoreError> {
        let client = redis::Client::open(url).map_err(|e| CounterStoreError::Unreachable(format!("invalid redis url {url}: {e}")))?;
        let conn = client.get_connection().map_err(|e| CounterStoreError::Unreachable(e.to_string()))?;
        info!(url, key_prefix, "connected to redis");
        Ok(Self { conn: Mutex::new(conn), key_prefix: key_prefix.to_string() })
    }

    pub fn key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CounterStoreError> {
        self.conn.lock().map_err(|_| CounterStoreError::Unreachable("redis connection lock poisoned".to_string()))
    }
}

/// Type mismatches and non-integer values mean a corrupt counter; anything
/// else is treated as the store being unavailable.
pub fn counter_error(key: &str, e: RedisError) -> CounterStoreError {
    let not_integer = e.kind() == ErrorKind::ResponseError && e.to_string().contains("not an integer");
    if e.kind() == ErrorKind::TypeError || not_integer {
        CounterStoreError::Corrupt { key: key.to_string(), reason: e.to_string() }
    } else {
        CounterStoreError::Unreachable(e.to_string())
    }
}

impl CounterStore for RedisCounterStore {
    fn get(&self, id: &str) -> Result<Option<u64>, CounterStoreError> {
        let key = self.key(id);
        self.conn()?.get(&key).map_err(|e| counter_error(&key, e))
    }

    fn set(&self, id: &str, value: u64) -> Result<(), CounterStoreError> {
        let key = self.key(id);
        self.conn()?.set::<_, _, ()>(&key, value).map_err(|e| counter_error(&key, e))?;
        debug!(%key, value, "set counter");
        Ok(())
    }

    fn incr(&self, id: &str) -> Result<u64, CounterStoreError> {
        let key = self.key(id);
        self.conn()?.incr(&key, 1u64).map_err(|e| counter_error(&key, e))
    }

    fn delete(&self, id: &str) -> Result<bool, CounterStoreError> {
        let key = self.key(id);
        let removed: u64 = self.conn()?.del(&key).map_err(|e| counter_error(&key, e))?;
        Ok(removed > 0)
    }
}
