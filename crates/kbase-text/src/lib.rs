//! kbase-text
//!
//! Embedded [`SearchEngine`](kbase_core::traits::SearchEngine) backed by
//! tantivy. Index settings and field mappings use the same JSON documents as
//! a remote cluster, so the same `mappings/` files initialize either backend.
pub mod tantivy_utils;
pub mod index;
pub mod search;
pub mod engine;

pub use engine::TantivyEngine;
pub use index::ArticleIndex;
pub use tantivy_utils::AnalysisSettings;
