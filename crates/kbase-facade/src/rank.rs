use kbase_core::types::{RankedResult, SearchHit};

/// Orders enriched hits into the final result list.
pub trait Ranker: Send + Sync {
    fn rank(&self, hits: Vec<SearchHit>) -> Vec<RankedResult>;
}

/// Most viewed first. The sort is stable, so equally viewed hits keep the
/// engine's relevance order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewCountRanker;

impl Ranker for ViewCountRanker {
    fn rank(&self, mut hits: Vec<SearchHit>) -> Vec<RankedResult> {
        hits.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        hits.into_iter().map(RankedResult::from).collect()
    }
}
