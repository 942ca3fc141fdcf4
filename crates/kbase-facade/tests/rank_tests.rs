use kbase_core::types::{RankedResult, SearchHit};
use kbase_facade::{Ranker, ViewCountRanker};

fn ids(results: &[RankedResult]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn most_viewed_first_with_ties_in_relevance_order() {
    let hits = vec![SearchHit::new("a", "A", 5), SearchHit::new("b", "B", 5), SearchHit::new("c", "C", 9)];
    let ranked = ViewCountRanker.rank(hits);
    assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
    assert_eq!(ranked[0].title, "C");
}

#[test]
fn empty_in_empty_out() {
    assert!(ViewCountRanker.rank(Vec::new()).is_empty());
}

#[test]
fn equal_counts_keep_input_order() {
    let hits: Vec<_> = ["x", "y", "z", "w"].iter().map(|id| SearchHit::new(*id, id.to_uppercase(), 0)).collect();
    assert_eq!(ids(&ViewCountRanker.rank(hits)), vec!["x", "y", "z", "w"]);
}

#[test]
fn output_is_a_permutation_of_input() {
    let hits = vec![
        SearchHit::new("1", "one", 3),
        SearchHit::new("2", "two", 0),
        SearchHit::new("3", "three", 10),
        SearchHit::new("4", "four", 3),
    ];
    let ranked = ViewCountRanker.rank(hits);
    assert_eq!(ids(&ranked), vec!["3", "1", "4", "2"]);
    let mut sorted = ids(&ranked);
    sorted.sort();
    assert_eq!(sorted, vec!["1", "2", "3", "4"]);
}
