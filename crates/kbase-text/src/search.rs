use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{TantivyDocument, Term};
use tracing::debug;

use kbase_core::error::EngineError;
use kbase_core::types::{Article, EngineHit, TextQuery};

use crate::index::ArticleIndex;
use crate::tantivy_utils::{engine_error, LOCALE_FIELD};

impl ArticleIndex {
	pub fn get_article(&self, id: &str) -> Result<Article, EngineError> {
		match self.find(id)? {
			Some(doc) => Ok(self.to_article(&doc)),
			None => Err(EngineError::NotFound(format!("document [{id}] not found in [{}]", self.name))),
		}
	}

	/// Weighted multi-field match with an optional non-scoring locale filter.
	/// The text is matched literally: query syntax such as `field:value`,
	/// `+term` or `AND` is not interpreted.
	pub fn search(&self, query: &TextQuery) -> Result<Vec<EngineHit>, EngineError> {
		let schema = self.index.schema();
		let mut fields = Vec::with_capacity(query.fields.len());
		for boost in &query.fields {
			let field = schema.get_field(&boost.field).map_err(|_| EngineError::rejected(format!("unknown search field [{}]", boost.field)))?;
			fields.push((field, boost.boost));
		}
		let mut query_parser = QueryParser::for_index(&self.index, fields.iter().map(|(f, _)| *f).collect());
		for (field, boost) in &fields { query_parser.set_field_boost(*field, *boost); }
		let (text_query, errors) = query_parser.parse_query_lenient(&literal_terms(&query.text));
		if let Some(first_error) = errors.first() {
			debug!(error_count = errors.len(), first_error = %first_error, "lenient query parse produced warnings");
		}

		let q: Box<dyn Query> = match &query.locale {
			Some(locale) => {
				let locale_field = self.fields.locale.ok_or_else(|| EngineError::rejected(format!("field [{LOCALE_FIELD}] is not mapped in [{}]", self.name)))?;
				let filter = TermQuery::new(Term::from_field_text(locale_field, locale), IndexRecordOption::Basic);
				Box::new(BooleanQuery::new(vec![
					(Occur::Must, text_query),
					(Occur::Must, Box::new(BoostQuery::new(Box::new(filter), 0.0)) as Box<dyn Query>),
				]))
			}
			None => text_query,
		};

		let searcher = self.reader.searcher();
		let top_docs = searcher.search(q.as_ref(), &TopDocs::with_limit(query.size.max(1))).map_err(engine_error)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(engine_error)?;
			let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let title = doc.get_first(self.fields.title).and_then(|v| v.as_str()).unwrap_or("").to_string();
			hits.push(EngineHit { id, title, score });
		}
		debug!(index = %self.name, text = %query.text, hits = hits.len(), "executed query");
		Ok(hits)
	}

	/// Looks a document up by id: staged writes first, then the last
	/// committed view.
	pub(crate) fn find(&self, id: &str) -> Result<Option<TantivyDocument>, EngineError> {
		if let Some(staged) = self.staged_doc(id)? { return Ok(staged); }
		let searcher = self.reader.searcher();
		let q = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
		let top_docs = searcher.search(&q, &TopDocs::with_limit(1)).map_err(engine_error)?;
		match top_docs.first() {
			Some((_, addr)) => Ok(Some(searcher.doc(*addr).map_err(engine_error)?)),
			None => Ok(None),
		}
	}
}

/// Lowercased words separated by spaces. The analyzer splits on the same
/// non-alphanumeric boundaries and lowercases, so the terms are unchanged,
/// but nothing is left for the query parser to read as syntax.
pub(crate) fn literal_terms(text: &str) -> String {
	text.chars()
		.flat_map(|c| if c.is_alphanumeric() { c.to_lowercase().collect::<Vec<_>>() } else { vec![' '] })
		.collect()
}
