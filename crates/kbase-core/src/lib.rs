#![deny(dead_code)]
#![deny(unused_variables)]

pub mod article_loader;
pub mod config;
pub mod error;
pub mod schema;
pub mod traits;
pub mod types;

/// Default engine-side index holding the articles.
pub const DEFAULT_INDEX: &str = "articles";
