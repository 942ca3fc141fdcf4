use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tantivy::schema::{Field, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use kbase_core::error::EngineError;
use kbase_core::types::{Article, BulkAction, BulkItem, BulkOp, BulkResponse, DeleteResponse, IndexResponse, Refresh};

use crate::tantivy_utils::{engine_error, register_tokenizer, AnalysisSettings, BODY_FIELD, ID_FIELD, LOCALE_FIELD, TITLE_FIELD};

const WRITER_HEAP_BYTES: usize = 50_000_000;
const GENERATED_ID_LEN: usize = 20;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ArticleFields {
	pub(crate) id: Field,
	pub(crate) title: Field,
	pub(crate) body: Field,
	pub(crate) locale: Option<Field>,
}

/// Staged writes not yet committed, by id: `Some` for an upsert, `None` for
/// a delete. Lookups by id consult this before the committed view.
pub(crate) type Staged = HashMap<String, Option<TantivyDocument>>;

/// One mapped tantivy index with its single writer and a manually reloaded
/// reader. Staged writes become searchable on `commit`, but are visible to
/// lookups by id right away.
pub struct ArticleIndex {
	pub(crate) name: String,
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	writer: Mutex<IndexWriter>,
	staged: Mutex<Staged>,
	pub(crate) fields: ArticleFields,
}

impl ArticleIndex {
	pub fn open(name: &str, index: Index, analysis: &AnalysisSettings) -> Result<Self, EngineError> {
		register_tokenizer(&index, analysis);
		let schema = index.schema();
		let field = |n: &str| schema.get_field(n).map_err(engine_error);
		let fields = ArticleFields { id: field(ID_FIELD)?, title: field(TITLE_FIELD)?, body: field(BODY_FIELD)?, locale: schema.get_field(LOCALE_FIELD).ok() };
		let writer: IndexWriter = index.writer(WRITER_HEAP_BYTES).map_err(engine_error)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(engine_error)?;
		Ok(Self { name: name.to_string(), index, reader, writer: Mutex::new(writer), staged: Mutex::new(HashMap::new()), fields })
	}

	pub fn index_article(&self, id: Option<&str>, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
		let doc = self.to_doc_parts(article)?;
		let (id, existed) = match id {
			Some(id) => (id.to_string(), self.find(id)?.is_some()),
			None => (generate_id(), false),
		};
		self.replace(&id, doc)?;
		if refresh.is_visible() { self.commit()?; }
		debug!(index = %self.name, %id, created = !existed, "indexed article");
		Ok(IndexResponse { created: !existed, id })
	}

	pub fn delete_article(&self, id: &str, refresh: Refresh) -> Result<DeleteResponse, EngineError> {
		let found = self.find(id)?.is_some();
		self.remove(id)?;
		if refresh.is_visible() { self.commit()?; }
		debug!(index = %self.name, %id, found, "deleted article");
		Ok(DeleteResponse { found })
	}

	/// Applies the operations in order. Existence checks see committed
	/// documents plus every earlier staged write, including those of this
	/// batch.
	pub fn bulk(&self, ops: &[BulkOp], refresh: Refresh) -> Result<BulkResponse, EngineError> {
		let mut items = Vec::with_capacity(ops.len());
		for op in ops {
			let action = op.action();
			let item = match op {
				BulkOp::Index { id, article } | BulkOp::Create { id, article } => {
					let id = id.clone().unwrap_or_else(generate_id);
					let existed = self.find(&id)?.is_some();
					if action == BulkAction::Create && existed {
						failed(action, &id, 409, format!("version_conflict_engine_exception: [{id}] document already exists"))
					} else {
						match self.to_doc_parts(article) {
							Ok(doc) => { self.replace(&id, doc)?; succeeded(action, &id, if existed { 200 } else { 201 }) }
							Err(e) => failed(action, &id, 400, e.to_string()),
						}
					}
				}
				BulkOp::Update { id, article } => {
					if self.find(id)?.is_none() {
						failed(action, id, 404, format!("document_missing_exception: [{id}] document missing"))
					} else {
						match self.to_doc_parts(article) {
							Ok(doc) => { self.replace(id, doc)?; succeeded(action, id, 200) }
							Err(e) => failed(action, id, 400, e.to_string()),
						}
					}
				}
				BulkOp::Delete { id } => {
					let existed = self.find(id)?.is_some();
					self.remove(id)?;
					succeeded(action, id, if existed { 200 } else { 404 })
				}
			};
			items.push(item);
		}
		if refresh.is_visible() { self.commit()?; }
		debug!(index = %self.name, ops = ops.len(), "applied bulk request");
		Ok(BulkResponse { items })
	}

	pub fn commit(&self) -> Result<(), EngineError> {
		{
			let mut writer = self.writer()?;
			writer.commit().map_err(engine_error)?;
			self.staged()?.clear();
		}
		self.reader.reload().map_err(engine_error)
	}

	/// The staged state of `id`: `Some(Some(doc))` when upserted,
	/// `Some(None)` when deleted, `None` when untouched since the last commit.
	pub(crate) fn staged_doc(&self, id: &str) -> Result<Option<Option<TantivyDocument>>, EngineError> {
		Ok(self.staged()?.get(id).cloned())
	}

	fn replace(&self, id: &str, doc: DocParts) -> Result<(), EngineError> {
		let doc = doc.with_id(self.fields.id, id);
		let writer = self.writer()?;
		writer.delete_term(self.id_term(id));
		writer.add_document(doc.clone()).map_err(engine_error)?;
		self.staged()?.insert(id.to_string(), Some(doc));
		Ok(())
	}

	fn remove(&self, id: &str) -> Result<(), EngineError> {
		let writer = self.writer()?;
		writer.delete_term(self.id_term(id));
		self.staged()?.insert(id.to_string(), None);
		Ok(())
	}

	fn staged(&self) -> Result<MutexGuard<'_, Staged>, EngineError> {
		self.staged.lock().map_err(|_| EngineError::rejected("staged writes lock poisoned"))
	}

	fn writer(&self) -> Result<MutexGuard<'_, IndexWriter>, EngineError> {
		self.writer.lock().map_err(|_| EngineError::rejected("index writer lock poisoned"))
	}

	pub(crate) fn id_term(&self, id: &str) -> Term {
		Term::from_field_text(self.fields.id, id)
	}

	fn to_doc_parts(&self, article: &Article) -> Result<DocParts, EngineError> {
		let mut doc = TantivyDocument::new();
		doc.add_text(self.fields.title, &article.title);
		doc.add_text(self.fields.body, &article.body);
		if let Some(locale) = &article.locale {
			let field = self.fields.locale.ok_or_else(|| EngineError::rejected(format!("mapper_parsing_exception: field [{LOCALE_FIELD}] is not mapped in [{}]", self.name)))?;
			doc.add_text(field, locale);
		}
		Ok(DocParts(doc))
	}

	pub(crate) fn to_article(&self, doc: &TantivyDocument) -> Article {
		let text = |field: Field| doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string();
		Article {
			title: text(self.fields.title),
			body: text(self.fields.body),
			locale: self.fields.locale.and_then(|f| doc.get_first(f).and_then(|v| v.as_str()).map(str::to_string)),
		}
	}
}

/// Article fields awaiting their id.
struct DocParts(TantivyDocument);

impl DocParts {
	fn with_id(mut self, field: Field, id: &str) -> TantivyDocument {
		self.0.add_text(field, id);
		self.0
	}
}

fn generate_id() -> String {
	rand::thread_rng().sample_iter(&Alphanumeric).take(GENERATED_ID_LEN).map(char::from).collect()
}

fn succeeded(action: BulkAction, id: &str, status: u16) -> BulkItem {
	BulkItem { action, id: Some(id.to_string()), status, error: None }
}

fn failed(action: BulkAction, id: &str, status: u16, error: String) -> BulkItem {
	BulkItem { action, id: Some(id.to_string()), status, error: Some(error) }
}
