//! kbase-elastic
//!
//! [`SearchEngine`](kbase_core::traits::SearchEngine) over the Elasticsearch
//! REST API, using a blocking reqwest client. Only the typeless document
//! endpoints are used.
pub mod client;
pub mod wire;

pub use client::ElasticClient;
