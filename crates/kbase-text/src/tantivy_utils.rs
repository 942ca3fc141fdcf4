use serde::{Deserialize, Serialize};
use serde_json::Value;
use tantivy::schema::{Schema, TextFieldIndexing, TextOptions, IndexRecordOption, STRING, STORED};
use tantivy::tokenizer::{TextAnalyzer, SimpleTokenizer, LowerCaser, StopWordFilter};
use tantivy::{Index, TantivyError};

use kbase_core::error::EngineError;

pub const TOKENIZER_NAME: &str = "kbase_text";
/// Internal document identity field.
pub const ID_FIELD: &str = "_id";
pub const TITLE_FIELD: &str = "title";
pub const BODY_FIELD: &str = "body";
pub const LOCALE_FIELD: &str = "locale";

const ENGLISH_STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// Analysis options lifted from an index settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
	pub stopwords: Option<Vec<String>>,
}

impl AnalysisSettings {
	/// Reads `settings.analysis.analyzer.default.stopwords`; the `settings`
	/// wrapper is optional. `"_english_"` selects the built-in list, `"_none_"`
	/// disables stop words.
	pub fn from_index_settings(settings: &Value) -> Result<Self, EngineError> {
		let root = settings.get("settings").unwrap_or(settings);
		let stopwords = root.pointer("/analysis/analyzer/default/stopwords");
		let stopwords = match stopwords {
			None | Some(Value::Null) => None,
			Some(Value::String(name)) if name == "_english_" => Some(ENGLISH_STOP_WORDS.iter().map(|s| s.to_string()).collect()),
			Some(Value::String(name)) if name == "_none_" => None,
			Some(Value::Array(words)) => Some(
				words.iter()
					.map(|w| w.as_str().map(str::to_string).ok_or_else(|| EngineError::rejected("stopwords must be strings")))
					.collect::<Result<Vec<_>, _>>()?,
			),
			Some(other) => return Err(EngineError::rejected(format!("unsupported stopwords setting: {other}"))),
		};
		Ok(Self { stopwords })
	}
}

/// Builds the tantivy schema for a field mapping document
/// (`{"properties": {"title": {"type": "text"}, ...}}`).
///
/// A legacy typed mapping (`{"article": {"properties": ...}}`) is unwrapped.
pub fn build_schema(mapping: &Value) -> Result<Schema, EngineError> {
	let properties = mapping
		.get("properties")
		.or_else(|| mapping.as_object().filter(|o| o.len() == 1).and_then(|o| o.values().next()).and_then(|t| t.get("properties")))
		.and_then(Value::as_object)
		.ok_or_else(|| EngineError::rejected("mapping has no properties"))?;

	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(ID_FIELD, STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	for (name, spec) in properties {
		if name == ID_FIELD { return Err(EngineError::rejected(format!("field name [{ID_FIELD}] is reserved"))); }
		match spec.get("type").and_then(Value::as_str) {
			Some("text") => { schema_builder.add_text_field(name, text_options.clone()); }
			Some("keyword") => { schema_builder.add_text_field(name, STRING | STORED); }
			other => return Err(EngineError::rejected(format!("unsupported type {other:?} for field [{name}]"))),
		}
	}
	for required in [TITLE_FIELD, BODY_FIELD] {
		let is_text = properties.get(required).and_then(|s| s.get("type")).and_then(Value::as_str) == Some("text");
		if !is_text { return Err(EngineError::rejected(format!("field [{required}] must be mapped as text"))); }
	}
	Ok(schema_builder.build())
}

pub fn register_tokenizer(index: &Index, analysis: &AnalysisSettings) {
	let tokenizer = match &analysis.stopwords {
		Some(stop_words) => TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(stop_words.iter().cloned()))
			.build(),
		None => TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build(),
	};
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

pub(crate) fn engine_error(e: TantivyError) -> EngineError {
	match e {
		TantivyError::IoError(_) | TantivyError::LockFailure(..) | TantivyError::OpenDirectoryError(_) => EngineError::Unreachable(format!("tantivy: {e}")),
		other => EngineError::rejected(format!("tantivy: {other}")),
	}
}
