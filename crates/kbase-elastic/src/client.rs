use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use kbase_core::error::EngineError;
use kbase_core::traits::SearchEngine;
use kbase_core::types::{Article, BulkOp, BulkResponse, DeleteResponse, EngineHit, IndexResponse, Refresh, TextQuery};

use crate::wire::{self, BulkResponseBody, GetResponse, SearchResponse, WriteResponse};

/// Blocking Elasticsearch client for a single cluster endpoint.
pub struct ElasticClient {
    base: Url,
    http: Client,
    credentials: Option<(String, Option<String>)>,
}

impl ElasticClient {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self, EngineError> {
        let base = Url::parse(url).map_err(|e| EngineError::Unreachable(format!("invalid cluster url {url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(EngineError::Unreachable(format!("invalid cluster url {url}")));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| EngineError::Unreachable(format!("failed to build http client: {e}")))?;
        info!(url = %base, "configured elasticsearch client");
        Ok(Self { base, http, credentials: None })
    }

    pub fn with_basic_auth<U: Into<String>>(mut self, username: U, password: Option<String>) -> Self {
        self.credentials = Some((username.into(), password));
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, EngineError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Unreachable(format!("invalid cluster url {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, EngineError> {
        let request = self.http.request(method, self.url(segments)?);
        Ok(match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_deref()),
            None => request,
        })
    }

    /// Sends the request and returns the status with the decoded body
    /// (`Null` when the body is empty).
    fn send(&self, request: RequestBuilder) -> Result<(u16, Value), EngineError> {
        let response = request.send().map_err(|e| EngineError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| EngineError::Unreachable(e.to_string()))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| EngineError::Rejected { status: Some(status), reason: format!("invalid response body: {e}") })?
        };
        debug!(status, "elasticsearch responded");
        Ok((status, body))
    }

    /// Sends the request and fails on any non-success status.
    fn send_ok(&self, request: RequestBuilder) -> Result<Value, EngineError> {
        let (status, body) = self.send(request)?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(wire::error_from_response(status, &body))
        }
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, EngineError> {
    serde_json::from_value(body).map_err(|e| EngineError::rejected(format!("unexpected response shape: {e}")))
}

impl SearchEngine for ElasticClient {
    fn create_index(&self, index: &str, settings: &Value) -> Result<(), EngineError> {
        self.send_ok(self.request(Method::PUT, &[index])?.json(settings))?;
        info!(index, "created index");
        Ok(())
    }

    fn put_mapping(&self, index: &str, mapping: &Value) -> Result<(), EngineError> {
        self.send_ok(self.request(Method::PUT, &[index, "_mapping"])?.json(mapping))?;
        info!(index, "put mapping");
        Ok(())
    }

    fn query(&self, index: &str, query: &TextQuery) -> Result<Vec<EngineHit>, EngineError> {
        let body = self.send_ok(self.request(Method::POST, &[index, "_search"])?.json(&wire::search_body(query)))?;
        let response: SearchResponse = decode(body)?;
        Ok(response.hits.hits.into_iter().map(EngineHit::from).collect())
    }

    fn get(&self, index: &str, id: &str) -> Result<Article, EngineError> {
        let (status, body) = self.send(self.request(Method::GET, &[index, "_doc", id])?)?;
        if status == 404 && body.get("error").is_none() {
            return Err(EngineError::NotFound(format!("document [{id}] not found in [{index}]")));
        }
        if !(200..300).contains(&status) {
            return Err(wire::error_from_response(status, &body));
        }
        let response: GetResponse = decode(body)?;
        match response.source {
            Some(article) if response.found => Ok(article),
            _ => Err(EngineError::NotFound(format!("document [{id}] not found in [{index}]"))),
        }
    }

    fn index(&self, index: &str, id: Option<&str>, article: &Article, refresh: Refresh) -> Result<IndexResponse, EngineError> {
        let request = match id {
            Some(id) => self.request(Method::PUT, &[index, "_doc", id])?,
            None => self.request(Method::POST, &[index, "_doc"])?,
        };
        let body = self.send_ok(request.query(&[("refresh", refresh.as_str())]).json(article))?;
        let response: WriteResponse = decode(body)?;
        debug!(index, id = %response.id, result = %response.result, "indexed article");
        Ok(IndexResponse { created: response.result == "created", id: response.id })
    }

    fn delete(&self, index: &str, id: &str, refresh: Refresh) -> Result<DeleteResponse, EngineError> {
        let request = self.request(Method::DELETE, &[index, "_doc", id])?.query(&[("refresh", refresh.as_str())]);
        let (status, body) = self.send(request)?;
        let found = match status {
            200..=299 => true,
            404 if body.get("result").and_then(Value::as_str) == Some("not_found") => false,
            _ => return Err(wire::error_from_response(status, &body)),
        };
        debug!(index, id, found, "deleted article");
        Ok(DeleteResponse { found })
    }

    fn bulk(&self, index: &str, ops: &[BulkOp], refresh: Refresh) -> Result<BulkResponse, EngineError> {
        if ops.is_empty() {
            return Ok(BulkResponse::default());
        }
        let request = self
            .request(Method::POST, &[index, "_bulk"])?
            .query(&[("refresh", refresh.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(wire::bulk_body(ops)?);
        let response: BulkResponseBody = decode(self.send_ok(request)?)?;
        let items = response.into_items(ops);
        debug!(index, ops = ops.len(), items = items.len(), "applied bulk request");
        Ok(BulkResponse { items })
    }

    fn refresh(&self, index: &str) -> Result<(), EngineError> {
        self.send_ok(self.request(Method::POST, &[index, "_refresh"])?)?;
        Ok(())
    }
}
