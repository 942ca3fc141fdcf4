use tracing::{debug, info, warn};

use kbase_core::error::{EngineError, QueryError};
use kbase_core::schema::SchemaFiles;
use kbase_core::traits::{CounterStore, SearchEngine};
use kbase_core::types::{
    Article, BulkAction, BulkItem, BulkOp, FieldBoost, IndexOutcome, IndexResponse, InitOutcome, RankedResult, Refresh,
    SearchHit, TextQuery,
};
use kbase_core::DEFAULT_INDEX;

use crate::rank::{Ranker, ViewCountRanker};

pub const TITLE_BOOST: f32 = 2.0;
pub const BODY_BOOST: f32 = 1.0;
pub const DEFAULT_MAX_HITS: usize = 10;

/// Outcome of a bulk request after counters were synchronized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub failures: Vec<BulkItem>,
}

/// Search facade over a search engine and a view counter store.
///
/// Counter writes are secondary: they are attempted after the engine call
/// succeeded and their failures are only logged, so counts may drift.
pub struct KnowledgeBase<E, C>
where
    E: SearchEngine,
    C: CounterStore,
{
    engine: E,
    counters: C,
    ranker: Box<dyn Ranker>,
    index: String,
    max_hits: usize,
}

impl<E, C> KnowledgeBase<E, C>
where
    E: SearchEngine,
    C: CounterStore,
{
    pub fn new(engine: E, counters: C) -> Self {
        Self {
            engine,
            counters,
            ranker: Box::new(ViewCountRanker),
            index: DEFAULT_INDEX.to_string(),
            max_hits: DEFAULT_MAX_HITS,
        }
    }

    pub fn with_index<S: Into<String>>(mut self, index: S) -> Self {
        self.index = index.into();
        self
    }

    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    pub fn with_ranker(mut self, ranker: Box<dyn Ranker>) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn counters(&self) -> &C {
        &self.counters
    }

    /// Creates the index from its settings document, then applies the field
    /// mapping.
    pub fn init_index(&self, schema: &SchemaFiles) -> InitOutcome {
        if let Err(e) = self.engine.create_index(&self.index, &schema.index_settings) {
            warn!(index = %self.index, error = %e, "failed to create index");
            return InitOutcome::failed("Failed to create Index");
        }
        if let Err(e) = self.engine.put_mapping(&self.index, &schema.type_mapping) {
            warn!(index = %self.index, error = %e, "failed to put mapping");
            return InitOutcome::failed("Failed to put Mapping");
        }
        info!(index = %self.index, "initialized index");
        InitOutcome::ok("Successfully initialized Index")
    }

    /// Relevance query over title and body, re-ranked by view count.
    ///
    /// Never writes counters. A missing or unreadable count ranks as 0.
    pub fn search(&self, query_text: &str, locale: Option<&str>) -> Result<Vec<RankedResult>, QueryError> {
        if query_text.trim().is_empty() {
            debug!("empty query, nothing to match");
            return Ok(Vec::new());
        }
        let query = TextQuery {
            text: query_text.to_string(),
            fields: vec![FieldBoost::new("title", TITLE_BOOST), FieldBoost::new("body", BODY_BOOST)],
            locale: locale.map(str::to_string),
            size: self.max_hits,
        };
        let hits = self.engine.query(&self.index, &query)?;
        let enriched: Vec<SearchHit> = hits
            .into_iter()
            .map(|hit| {
                let view_count = self.view_count(&hit.id);
                SearchHit { id: hit.id, title: hit.title, view_count }
            })
            .collect();
        debug!(query = query_text, locale, hits = enriched.len(), "ranking hits");
        Ok(self.ranker.rank(enriched))
    }

    fn view_count(&self, id: &str) -> u64 {
        match self.counters.get(id) {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                warn!(%id, error = %e, "view count unavailable, ranking as 0");
                0
            }
        }
    }

    /// Fetches an article and counts the view.
    pub fn try_get(&self, id: &str) -> Result<Article, EngineError> {
        let article = self.engine.get(&self.index, id)?;
        match self.counters.incr(id) {
            Ok(count) => debug!(%id, count, "counted view"),
            Err(e) => warn!(%id, error = %e, "failed to count view"),
        }
        Ok(article)
    }

    pub fn get(&self, id: &str) -> Option<Article> {
        match self.try_get(id) {
            Ok(article) => Some(article),
            Err(e) => {
                debug!(%id, error = %e, "get failed");
                None
            }
        }
    }

    /// Indexes a new article under an engine-assigned id.
    pub fn try_index(&self, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
        self.write(None, article, refresh)
    }

    /// Creates or replaces the article stored under `id`.
    pub fn try_index_with_id(&self, id: &str, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
        self.write(Some(id), article, refresh)
    }

    pub fn index(&self, article: &Article, refresh: Refresh) -> IndexOutcome {
        collapse_index(self.try_index(article, refresh))
    }

    pub fn index_with_id(&self, id: &str, article: &Article, refresh: Refresh) -> IndexOutcome {
        collapse_index(self.try_index_with_id(id, article, refresh))
    }

    fn write(&self, id: Option<&str>, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
        let response = self.engine.index(&self.index, id, article, refresh)?;
        if !response.created {
            debug!(id = %response.id, "re-indexed existing article, view count resets to 0");
        }
        self.reset_count(&response.id);
        Ok(response)
    }

    fn reset_count(&self, id: &str) {
        if let Err(e) = self.counters.set(id, 0) {
            warn!(%id, error = %e, "failed to initialize view count");
        }
    }

    fn drop_count(&self, id: &str) {
        if let Err(e) = self.counters.delete(id) {
            warn!(%id, error = %e, "failed to delete view count");
        }
    }

    /// Deletes the article and its counter. Returns whether the engine found
    /// the article; the counter is removed either way.
    pub fn try_delete(&self, id: &str, refresh: Refresh) -> Result<bool, EngineError> {
        let response = self.engine.delete(&self.index, id, refresh)?;
        self.drop_count(id);
        Ok(response.found)
    }

    pub fn delete(&self, id: &str, refresh: Refresh) -> bool {
        self.try_delete(id, refresh).unwrap_or_else(|e| {
            debug!(%id, error = %e, "delete failed");
            false
        })
    }

    /// Forwards the operations in one engine call, then syncs the counter of
    /// every item that succeeded: index/create start at 0, delete removes it.
    pub fn bulk(&self, ops: &[BulkOp], refresh: Refresh) -> Result<BulkReport, EngineError> {
        let response = self.engine.bulk(&self.index, ops, refresh)?;
        let mut report = BulkReport::default();
        for item in response.items {
            if !item.is_ok() {
                report.failures.push(item);
                continue;
            }
            report.succeeded += 1;
            let Some(id) = item.id.as_deref() else { continue };
            match item.action {
                BulkAction::Index | BulkAction::Create => self.reset_count(id),
                BulkAction::Delete => self.drop_count(id),
                BulkAction::Update => {}
            }
        }
        info!(index = %self.index, succeeded = report.succeeded, failed = report.failures.len(), "bulk request done");
        Ok(report)
    }

    /// Makes pending writes visible, then releases both collaborators.
    pub fn close(self) {
        if let Err(e) = self.engine.refresh(&self.index) {
            warn!(index = %self.index, error = %e, "final refresh failed");
        }
        debug!(index = %self.index, "closed knowledge base");
    }
}

fn collapse_index(result: Result<IndexResponse, EngineError>) -> IndexOutcome {
    match result {
        Ok(response) => response.into(),
        Err(e) => {
            debug!(error = %e, "index failed");
            IndexOutcome::failed()
        }
    }
}
