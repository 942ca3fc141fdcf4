//! kbase-counter
//!
//! [`CounterStore`](kbase_core::traits::CounterStore) backends for article
//! view counts.
pub mod file;
pub mod memory;
pub mod redis_store;

pub use file::FileCounterStore;
pub use memory::MemoryCounterStore;
pub use redis_store::RedisCounterStore;
