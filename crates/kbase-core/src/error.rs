//! Failure taxonomy shared by every backend and the facade.
//!
//! Engine and counter-store failures are kept apart so the facade can decide
//! which ones to propagate and which ones to swallow.
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a search engine client.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport-level failure: the engine could not be reached at all.
    #[error("search engine unreachable: {0}")]
    Unreachable(String),

    /// The engine answered but refused the request.
    #[error("search engine rejected request: {reason}")]
    Rejected { status: Option<u16>, reason: String },

    /// The index or document does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl EngineError {
    pub fn rejected<R: Into<String>>(reason: R) -> Self {
        Self::Rejected { status: None, reason: reason.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Failures reported by a counter store client.
#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("counter store unreachable: {0}")]
    Unreachable(String),

    /// The stored value under `key` is not a non-negative integer.
    #[error("counter '{key}' holds an invalid value: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Raised by `search` when the engine query fails. Never collapsed into an
/// empty result, since empty means "no matches".
#[derive(Debug, Error)]
#[error("search query failed: {0}")]
pub struct QueryError(#[from] pub EngineError);

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Counter(#[from] CounterStoreError),
}

impl Error {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn json<P: Into<PathBuf>>(path: P, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
