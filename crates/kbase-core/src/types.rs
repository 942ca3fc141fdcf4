//! Domain types exchanged between the facade and its collaborators.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Opaque identifier assigned by the search engine.
pub type ArticleId = String;

/// A knowledge-base article as stored in the search engine.
///
/// `locale` is an optional exact-match filter dimension (e.g. "en").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Article {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, body: B) -> Self {
        Self { title: title.into(), body: body.into(), locale: None }
    }

    pub fn with_locale<L: Into<String>>(mut self, locale: L) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Visibility knob forwarded to the engine on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
    /// Make the change searchable before returning.
    #[default]
    True,
    /// Leave visibility to the engine's own refresh cycle.
    False,
    /// Block until the next scheduled refresh makes the change visible.
    WaitFor,
}

impl Refresh {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::WaitFor => "wait_for",
        }
    }

    /// Whether the write has to be visible when the call returns.
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::False)
    }
}

impl From<bool> for Refresh {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for Refresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Refresh {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            "wait_for" => Ok(Self::WaitFor),
            other => Err(format!("unknown refresh policy '{other}'")),
        }
    }
}

impl Serialize for Refresh {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Refresh {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => Ok(Self::from(flag)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A searchable field and its relevance weight.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBoost {
    pub field: String,
    pub boost: f32,
}

impl FieldBoost {
    pub fn new<F: Into<String>>(field: F, boost: f32) -> Self {
        Self { field: field.into(), boost }
    }

    /// `field^boost` notation, omitting a neutral boost.
    pub fn to_caret_notation(&self) -> String {
        if (self.boost - 1.0).abs() < f32::EPSILON {
            self.field.clone()
        } else {
            format!("{}^{}", self.field, self.boost)
        }
    }
}

/// Relevance query across several weighted text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub text: String,
    pub fields: Vec<FieldBoost>,
    /// Exact-match filter on the `locale` field; does not affect scoring.
    pub locale: Option<String>,
    pub size: usize,
}

/// A raw engine hit, still in relevance order.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineHit {
    pub id: ArticleId,
    pub title: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResponse {
    /// `false` when an existing document was replaced.
    pub created: bool,
    pub id: ArticleId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResponse {
    pub found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Index,
    Create,
    Update,
    Delete,
}

impl BulkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Create or replace; the engine assigns an id when none is given.
    Index { id: Option<ArticleId>, article: Article },
    /// Create only; fails when the id already exists.
    Create { id: Option<ArticleId>, article: Article },
    /// Replace the fields of an existing document.
    Update { id: ArticleId, article: Article },
    Delete { id: ArticleId },
}

impl BulkOp {
    pub fn action(&self) -> BulkAction {
        match self {
            Self::Index { .. } => BulkAction::Index,
            Self::Create { .. } => BulkAction::Create,
            Self::Update { .. } => BulkAction::Update,
            Self::Delete { .. } => BulkAction::Delete,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Index { id, .. } | Self::Create { id, .. } => id.as_deref(),
            Self::Update { id, .. } | Self::Delete { id } => Some(id),
        }
    }
}

/// Per-operation outcome of a bulk request, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    pub action: BulkAction,
    pub id: Option<ArticleId>,
    pub status: u16,
    pub error: Option<String>,
}

impl BulkItem {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| !item.is_ok())
    }
}

/// A hit enriched with its popularity signal, ready for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: ArticleId,
    pub title: String,
    pub view_count: u64,
}

impl SearchHit {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, title: T, view_count: u64) -> Self {
        Self { id: id.into(), title: title.into(), view_count }
    }
}

/// Final search output: `(id, title)` in ranked order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedResult {
    pub id: ArticleId,
    pub title: String,
}

impl From<SearchHit> for RankedResult {
    fn from(hit: SearchHit) -> Self {
        Self { id: hit.id, title: hit.title }
    }
}

/// Compatibility result of `KnowledgeBase::index`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexOutcome {
    pub created: bool,
    pub id: Option<ArticleId>,
}

impl IndexOutcome {
    pub fn failed() -> Self {
        Self::default()
    }
}

impl From<IndexResponse> for IndexOutcome {
    fn from(response: IndexResponse) -> Self {
        Self { created: response.created, id: Some(response.id) }
    }
}

/// Result of the administrative schema initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub success: bool,
    pub message: String,
}

impl InitOutcome {
    pub fn ok<M: Into<String>>(message: M) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed<M: Into<String>>(message: M) -> Self {
        Self { success: false, message: message.into() }
    }
}
