use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tantivy::Index;
use tracing::{debug, info};

use kbase_core::error::EngineError;
use kbase_core::traits::SearchEngine;
use kbase_core::types::{Article, BulkOp, BulkResponse, DeleteResponse, EngineHit, IndexResponse, Refresh, TextQuery};

use crate::index::ArticleIndex;
use crate::tantivy_utils::{build_schema, engine_error, AnalysisSettings};

const SETTINGS_FILE: &str = "kbase_settings.json";
const META_FILE: &str = "meta.json";

/// Embedded search engine: one tantivy index per index name, either under a
/// root directory or held in RAM.
///
/// An index goes through two steps like a remote cluster: `create_index`
/// records its analysis settings, `put_mapping` fixes the schema and makes it
/// usable.
pub struct TantivyEngine {
	root: Option<PathBuf>,
	indices: RwLock<HashMap<String, Arc<ArticleIndex>>>,
	pending: Mutex<HashMap<String, AnalysisSettings>>,
}

impl TantivyEngine {
	pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, EngineError> {
		let root = root.as_ref().to_path_buf();
		fs::create_dir_all(&root).map_err(|e| EngineError::Unreachable(format!("{}: {e}", root.display())))?;
		info!(root = %root.display(), "opened tantivy engine");
		Ok(Self { root: Some(root), indices: RwLock::new(HashMap::new()), pending: Mutex::new(HashMap::new()) })
	}

	pub fn in_memory() -> Self {
		Self { root: None, indices: RwLock::new(HashMap::new()), pending: Mutex::new(HashMap::new()) }
	}

	fn index_dir(&self, name: &str) -> Option<PathBuf> {
		self.root.as_ref().map(|r| r.join(name))
	}

	fn is_mapped_on_disk(&self, name: &str) -> bool {
		self.index_dir(name).is_some_and(|d| d.join(META_FILE).exists())
	}

	fn is_created_on_disk(&self, name: &str) -> bool {
		self.index_dir(name).is_some_and(|d| d.join(SETTINGS_FILE).exists())
	}

	fn read_settings(&self, name: &str) -> Result<Option<AnalysisSettings>, EngineError> {
		let Some(path) = self.index_dir(name).map(|d| d.join(SETTINGS_FILE)) else { return Ok(None) };
		if !path.exists() { return Ok(None); }
		let raw = fs::read_to_string(&path).map_err(|e| EngineError::Unreachable(format!("{}: {e}", path.display())))?;
		let settings = serde_json::from_str(&raw).map_err(|e| EngineError::rejected(format!("{}: {e}", path.display())))?;
		Ok(Some(settings))
	}

	fn pending(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, AnalysisSettings>>, EngineError> {
		self.pending.lock().map_err(|_| EngineError::rejected("engine state lock poisoned"))
	}

	/// Resolves a mapped index, opening it from disk on first use.
	fn lookup(&self, name: &str) -> Result<Arc<ArticleIndex>, EngineError> {
		{
			let indices = self.indices.read().map_err(|_| EngineError::rejected("engine state lock poisoned"))?;
			if let Some(index) = indices.get(name) { return Ok(index.clone()); }
		}
		if self.is_mapped_on_disk(name) {
			let mut indices = self.indices.write().map_err(|_| EngineError::rejected("engine state lock poisoned"))?;
			if let Some(index) = indices.get(name) { return Ok(index.clone()); }
			let analysis = self.read_settings(name)?.unwrap_or_default();
			let dir = self.index_dir(name).ok_or_else(|| EngineError::NotFound(format!("index_not_found_exception: no such index [{name}]")))?;
			let index = Index::open_in_dir(&dir).map_err(engine_error)?;
			let opened = Arc::new(ArticleIndex::open(name, index, &analysis)?);
			indices.insert(name.to_string(), opened.clone());
			debug!(index = name, dir = %dir.display(), "opened index from disk");
			return Ok(opened);
		}
		if self.pending()?.contains_key(name) || self.is_created_on_disk(name) {
			return Err(EngineError::rejected(format!("index [{name}] has no mapping")));
		}
		Err(EngineError::NotFound(format!("index_not_found_exception: no such index [{name}]")))
	}

	fn exists(&self, name: &str) -> Result<bool, EngineError> {
		let loaded = self.indices.read().map_err(|_| EngineError::rejected("engine state lock poisoned"))?.contains_key(name);
		Ok(loaded || self.pending()?.contains_key(name) || self.is_created_on_disk(name) || self.is_mapped_on_disk(name))
	}
}

impl SearchEngine for TantivyEngine {
	fn create_index(&self, index: &str, settings: &Value) -> Result<(), EngineError> {
		if self.exists(index)? {
			return Err(EngineError::Rejected { status: Some(400), reason: format!("resource_already_exists_exception: index [{index}] already exists") });
		}
		let analysis = AnalysisSettings::from_index_settings(settings)?;
		if let Some(dir) = self.index_dir(index) {
			fs::create_dir_all(&dir).map_err(|e| EngineError::Unreachable(format!("{}: {e}", dir.display())))?;
			let raw = serde_json::to_string_pretty(&analysis).map_err(|e| EngineError::rejected(e.to_string()))?;
			fs::write(dir.join(SETTINGS_FILE), raw).map_err(|e| EngineError::Unreachable(format!("{}: {e}", dir.display())))?;
		}
		self.pending()?.insert(index.to_string(), analysis);
		info!(index, "created index");
		Ok(())
	}

	fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError> {
		let mapped = self.indices.read().map_err(|_| EngineError::rejected("engine state lock poisoned"))?.contains_key(index);
		if mapped || self.is_mapped_on_disk(index) {
			return Err(EngineError::Rejected { status: Some(400), reason: format!("illegal_argument_exception: mapping for [{index}] is already defined") });
		}
		let analysis = match self.pending()?.get(index).cloned() {
			Some(analysis) => analysis,
			None => self.read_settings(index)?.ok_or_else(|| EngineError::NotFound(format!("index_not_found_exception: no such index [{index}]")))?,
		};
		let schema = build_schema(mapping)?;
		let tantivy_index = match self.index_dir(index) {
			Some(dir) => Index::create_in_dir(&dir, schema).map_err(engine_error)?,
			None => Index::create_in_ram(schema),
		};
		let opened = Arc::new(ArticleIndex::open(index, tantivy_index, &analysis)?);
		self.indices.write().map_err(|_| EngineError::rejected("engine state lock poisoned"))?.insert(index.to_string(), opened);
		self.pending()?.remove(index);
		info!(index, "put mapping");
		Ok(())
	}

	fn query(&self, index: &str, query: &TextQuery) -> Result<Vec<EngineHit>, EngineError> {
		self.lookup(index)?.search(query)
	}

	fn get(&self, index: &str, id: &str) -> Result<Article, EngineError> {
		self.lookup(index)?.get_article(id)
	}

	fn index(&self, index: &str, id: Option<&str>, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
		self.lookup(index)?.index_article(id, article, refresh)
	}

	fn delete(&self, index: &str, id: &str, refresh: Refresh) -> Result<DeleteResponse, EngineError> {
		self.lookup(index)?.delete_article(id, refresh)
	}

	fn bulk(&self, index: &str, ops: &[BulkOp], refresh: Refresh) -> Result<BulkResponse, EngineError> {
		self.lookup(index)?.bulk(ops, refresh)
	}

	fn refresh(&self, index: &str) -> Result<(), EngineError> {
		self.lookup(index)?.commit()
	}
}
