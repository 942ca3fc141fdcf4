pub mod rank;
pub mod knowledge_base;
pub mod connect;

pub use connect::{connect, DynKnowledgeBase};
pub use knowledge_base::{BulkReport, KnowledgeBase};
pub use rank::{Ranker, ViewCountRanker};
