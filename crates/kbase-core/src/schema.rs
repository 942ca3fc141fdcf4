//! Index settings and field mapping documents, read once at init time.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFiles {
    /// Index-level settings (shards, analysis).
    pub index_settings: Value,
    /// Per-field types for the article document.
    pub type_mapping: Value,
}

impl SchemaFiles {
    pub fn load(index_path: &Path, type_path: &Path) -> Result<Self> {
        Ok(Self { index_settings: read_json(index_path)?, type_mapping: read_json(type_path)? })
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let value: Value = serde_json::from_str(&raw).map_err(|e| Error::json(path, e))?;
    if !value.is_object() {
        return Err(Error::InvalidConfig(format!("{} must contain a JSON object", path.display())));
    }
    Ok(value)
}
