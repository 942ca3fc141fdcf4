//! Request bodies and response shapes of the REST endpoints in use.
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use kbase_core::error::EngineError;
use kbase_core::types::{Article, BulkAction, BulkItem, BulkOp, EngineHit, TextQuery};

/// `bool.must.multi_match` over the weighted fields, with the locale as a
/// non-scoring `bool.filter.term`.
pub fn search_body(query: &TextQuery) -> Value {
    let fields: Vec<String> = query.fields.iter().map(|f| f.to_caret_notation()).collect();
    let mut bool_query = json!({
        "must": { "multi_match": { "query": query.text, "fields": fields } }
    });
    if let Some(locale) = &query.locale {
        bool_query["filter"] = json!([{ "term": { "locale": locale } }]);
    }
    json!({
        "size": query.size,
        "_source": ["title"],
        "query": { "bool": bool_query },
    })
}

/// Newline-delimited action/source pairs, terminated by a newline.
pub fn bulk_body(ops: &[BulkOp]) -> Result<String, EngineError> {
    let mut body = String::new();
    for op in ops {
        let mut meta = serde_json::Map::new();
        if let Some(id) = op.id() {
            meta.insert("_id".to_string(), Value::String(id.to_string()));
        }
        push_line(&mut body, &json!({ op.action().as_str(): meta }))?;
        match op {
            BulkOp::Index { article, .. } | BulkOp::Create { article, .. } => push_line(&mut body, article)?,
            BulkOp::Update { article, .. } => push_line(&mut body, &json!({ "doc": article }))?,
            BulkOp::Delete { .. } => {}
        }
    }
    Ok(body)
}

fn push_line<T: serde::Serialize>(body: &mut String, value: &T) -> Result<(), EngineError> {
    let line = serde_json::to_string(value).map_err(|e| EngineError::rejected(format!("failed to encode bulk line: {e}")))?;
    body.push_str(&line);
    body.push('\n');
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub source: Option<TitleSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleSource {
    #[serde(default)]
    pub title: String,
}

impl From<RawHit> for EngineHit {
    fn from(hit: RawHit) -> Self {
        EngineHit { id: hit.id, title: hit.source.unwrap_or_default().title, score: hit.score.unwrap_or(0.0) }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetResponse {
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<Article>,
}

/// Body of index and delete responses.
#[derive(Debug, Deserialize)]
pub struct WriteResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkResponseBody {
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItemBody>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItemBody {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkResponseBody {
    /// Pairs each response item with the action that produced it.
    pub fn into_items(self, ops: &[BulkOp]) -> Vec<BulkItem> {
        self.items
            .into_iter()
            .zip(ops)
            .filter_map(|(mut entry, op)| {
                let action: BulkAction = op.action();
                let body = entry.remove(action.as_str()).or_else(|| entry.into_values().next())?;
                Some(BulkItem { action, id: body.id, status: body.status, error: body.error.as_ref().map(error_reason) })
            })
            .collect()
    }
}

/// `"type: reason"` from an error object, or the raw value.
pub fn error_reason(error: &Value) -> String {
    match (error.get("type").and_then(Value::as_str), error.get("reason").and_then(Value::as_str)) {
        (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
        (Some(kind), None) => kind.to_string(),
        _ => match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// Maps a non-success response to the error taxonomy.
pub fn error_from_response(status: u16, body: &Value) -> EngineError {
    let error = body.get("error");
    let reason = match error {
        Some(error) => error_reason(error),
        None if body.is_null() => format!("HTTP {status}"),
        None => body.to_string(),
    };
    let kind = error.and_then(|e| e.get("type")).and_then(Value::as_str);
    if kind == Some("index_not_found_exception") {
        return EngineError::NotFound(reason);
    }
    EngineError::Rejected { status: Some(status), reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbase_core::types::FieldBoost;

    fn query(locale: Option<&str>) -> TextQuery {
        TextQuery {
            text: "how to pay".to_string(),
            fields: vec![FieldBoost::new("title", 2.0), FieldBoost::new("body", 1.0)],
            locale: locale.map(str::to_string),
            size: 10,
        }
    }

    #[test]
    fn search_body_weights_title_and_filters_locale() {
        let body = search_body(&query(Some("en")));
        assert_eq!(body["query"]["bool"]["must"]["multi_match"]["fields"], json!(["title^2", "body"]));
        assert_eq!(body["query"]["bool"]["filter"], json!([{ "term": { "locale": "en" } }]));
        assert_eq!(body["size"], json!(10));
        assert!(search_body(&query(None))["query"]["bool"].get("filter").is_none());
    }

    #[test]
    fn bulk_body_is_ndjson() {
        let ops = vec![
            BulkOp::Index { id: None, article: Article::new("A", "a") },
            BulkOp::Update { id: "2".into(), article: Article::new("B", "b") },
            BulkOp::Delete { id: "3".into() },
        ];
        let body = bulk_body(&ops).unwrap();
        let lines: Vec<Value> = body.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], json!({ "index": {} }));
        assert_eq!(lines[1], json!({ "title": "A", "body": "a" }));
        assert_eq!(lines[2], json!({ "update": { "_id": "2" } }));
        assert_eq!(lines[3], json!({ "doc": { "title": "B", "body": "b" } }));
        assert_eq!(lines[4], json!({ "delete": { "_id": "3" } }));
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn index_not_found_maps_to_not_found() {
        let body = json!({ "error": { "type": "index_not_found_exception", "reason": "no such index [articles]" }, "status": 404 });
        assert!(error_from_response(404, &body).is_not_found());
        let rejected = error_from_response(400, &json!({ "error": { "type": "mapper_parsing_exception", "reason": "bad" } }));
        assert!(matches!(rejected, EngineError::Rejected { status: Some(400), ref reason } if reason == "mapper_parsing_exception: bad"));
        assert!(matches!(error_from_response(502, &Value::Null), EngineError::Rejected { ref reason, .. } if reason == "HTTP 502"));
    }
}
