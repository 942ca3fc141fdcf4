use std::sync::atomic::{AtomicUsize, Ordering};

use kbase_core::error::{CounterStoreError, EngineError};
use kbase_core::schema::SchemaFiles;
use kbase_core::traits::{CounterStore, SearchEngine};
use kbase_core::types::{Article, BulkOp, BulkResponse, DeleteResponse, EngineHit, IndexResponse, Refresh, TextQuery};
use kbase_counter::MemoryCounterStore;
use kbase_core::config::Settings;
use kbase_facade::{connect, KnowledgeBase};
use kbase_text::TantivyEngine;
use serde_json::{json, Value};

fn schema() -> SchemaFiles {
    SchemaFiles {
        index_settings: json!({ "settings": { "analysis": { "analyzer": { "default": { "type": "standard", "stopwords": "_english_" } } } } }),
        type_mapping: json!({ "properties": { "title": { "type": "text" }, "body": { "type": "text" }, "locale": { "type": "keyword" } } }),
    }
}

/// Counts writes so tests can assert that reads stay read-only.
#[derive(Default)]
struct RecordingCounters {
    inner: MemoryCounterStore,
    writes: AtomicUsize,
}

impl RecordingCounters {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CounterStore for RecordingCounters {
    fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> {
        self.inner.get(key)
    }
    fn set(&self, key: &str, value: u64) -> Result<(), CounterStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
    fn incr(&self, key: &str) -> Result<u64, CounterStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.incr(key)
    }
    fn delete(&self, key: &str) -> Result<bool, CounterStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key)
    }
}

/// A counter store that is always down.
struct DownCounters;

impl CounterStore for DownCounters {
    fn get(&self, _: &str) -> Result<Option<u64>, CounterStoreError> {
        Err(CounterStoreError::Unreachable("down".into()))
    }
    fn set(&self, _: &str, _: u64) -> Result<(), CounterStoreError> {
        Err(CounterStoreError::Unreachable("down".into()))
    }
    fn incr(&self, _: &str) -> Result<u64, CounterStoreError> {
        Err(CounterStoreError::Unreachable("down".into()))
    }
    fn delete(&self, _: &str) -> Result<bool, CounterStoreError> {
        Err(CounterStoreError::Unreachable("down".into()))
    }
}

/// An engine whose every call fails as unreachable.
struct DownEngine;

fn down() -> EngineError {
    EngineError::Unreachable("connection refused".into())
}

impl SearchEngine for DownEngine {
    fn create_index(&self, _: &str, _: &Value) -> Result<(), EngineError> { Err(down()) }
    fn put_mapping(&self, _: &str, _: &Value) -> Result<(), EngineError> { Err(down()) }
    fn query(&self, _: &str, _: &TextQuery) -> Result<Vec<EngineHit>, EngineError> { Err(down()) }
    fn get(&self, _: &str, _: &str) -> Result<Article, EngineError> { Err(down()) }
    fn index(&self, _: &str, _: Option<&str>, _: &Article, _: Refresh) -> Result<IndexResponse, EngineError> { Err(down()) }
    fn delete(&self, _: &str, _: &str, _: Refresh) -> Result<DeleteResponse, EngineError> { Err(down()) }
    fn bulk(&self, _: &str, _: &[BulkOp], _: Refresh) -> Result<BulkResponse, EngineError> { Err(down()) }
    fn refresh(&self, _: &str) -> Result<(), EngineError> { Err(down()) }
}

fn ready_kb() -> KnowledgeBase<TantivyEngine, RecordingCounters> {
    let kb = KnowledgeBase::new(TantivyEngine::in_memory(), RecordingCounters::default());
    assert!(kb.init_index(&schema()).success);
    kb
}

#[test]
fn init_index_reports_each_step() {
    let kb = KnowledgeBase::new(TantivyEngine::in_memory(), MemoryCounterStore::new());
    let outcome = kb.init_index(&schema());
    assert!(outcome.success);
    assert_eq!(outcome.message, "Successfully initialized Index");

    let again = kb.init_index(&schema());
    assert!(!again.success);
    assert_eq!(again.message, "Failed to create Index");

    let bad_mapping = SchemaFiles { index_settings: json!({}), type_mapping: json!({ "properties": {} }) };
    let outcome = kb.with_index("other").init_index(&bad_mapping);
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Failed to put Mapping");
}

#[test]
fn popular_article_ranks_first() {
    let kb = ready_kb();
    let intro = kb.index(&Article::new("Intro", "getting started"), Refresh::True);
    assert!(intro.created);
    let intro_id = intro.id.expect("id");
    let other = kb.index(&Article::new("Intro", "getting started"), Refresh::True).id.expect("id");
    assert_eq!(kb.counters().get(&intro_id).unwrap(), Some(0));

    for _ in 0..3 {
        assert_eq!(kb.get(&intro_id).expect("article").title, "Intro");
    }
    assert_eq!(kb.counters().get(&intro_id).unwrap(), Some(3));

    let writes_before = kb.counters().writes();
    let results = kb.search("Intro", None).expect("search");
    assert_eq!(kb.counters().writes(), writes_before);
    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![intro_id.as_str(), other.as_str()]);
    assert!(results.iter().all(|r| r.title == "Intro"));
}

#[test]
fn search_applies_locale_filter() {
    let kb = ready_kb();
    kb.index_with_id("en", &Article::new("Billing", "invoices").with_locale("en"), Refresh::True);
    kb.index_with_id("de", &Article::new("Billing", "Rechnungen").with_locale("de"), Refresh::True);
    let results = kb.search("billing", Some("de")).expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "de");
}

#[test]
fn missing_counters_rank_as_zero() {
    let kb = ready_kb();
    kb.index_with_id("a", &Article::new("Guide", "one"), Refresh::True);
    kb.index_with_id("b", &Article::new("Guide", "two"), Refresh::True);
    kb.counters().inner.delete("a").unwrap();
    kb.counters().inner.set("b", 1).unwrap();
    let results = kb.search("guide", None).expect("search");
    assert_eq!(results[0].id, "b");
    assert_eq!(results.len(), 2);
}

#[test]
fn blank_queries_return_nothing() {
    let kb = KnowledgeBase::new(DownEngine, MemoryCounterStore::new());
    assert!(kb.search("", None).expect("empty").is_empty());
    assert!(kb.search("   ", Some("en")).expect("whitespace").is_empty());
}

#[test]
fn engine_failures_propagate_from_search_only() {
    let kb = KnowledgeBase::new(DownEngine, RecordingCounters::default());
    assert!(matches!(kb.search("intro", None), Err(e) if matches!(e.0, EngineError::Unreachable(_))));
    assert!(kb.get("x").is_none());
    assert!(matches!(kb.try_get("x"), Err(EngineError::Unreachable(_))));

    let outcome = kb.index(&Article::new("T", "B"), Refresh::True);
    assert!(!outcome.created);
    assert_eq!(outcome.id, None);

    assert!(!kb.delete("x", Refresh::True));
    assert_eq!(kb.counters().writes(), 0);
    assert!(kb.bulk(&[BulkOp::Delete { id: "x".into() }], Refresh::True).is_err());
    assert!(!kb.init_index(&schema()).success);
}

#[test]
fn get_of_missing_article_is_none_without_counting() {
    let kb = ready_kb();
    assert!(kb.get("nope").is_none());
    assert!(kb.try_get("nope").unwrap_err().is_not_found());
    assert_eq!(kb.counters().get("nope").unwrap(), None);
}

#[test]
fn counter_outage_never_fails_reads_or_writes() {
    let kb = KnowledgeBase::new(TantivyEngine::in_memory(), DownCounters);
    assert!(kb.init_index(&schema()).success);
    let id = kb.index(&Article::new("Intro", "hello"), Refresh::True).id.expect("indexed despite counter outage");
    assert_eq!(kb.get(&id).expect("get").body, "hello");
    assert_eq!(kb.search("intro", None).expect("search").len(), 1);
    assert!(kb.delete(&id, Refresh::True));
}

#[test]
fn reindexing_resets_the_view_count() {
    let kb = ready_kb();
    kb.index_with_id("a", &Article::new("Guide", "v1"), Refresh::True);
    kb.get("a");
    kb.get("a");
    assert_eq!(kb.counters().get("a").unwrap(), Some(2));
    let outcome = kb.index_with_id("a", &Article::new("Guide", "v2"), Refresh::True);
    assert!(!outcome.created);
    assert_eq!(kb.counters().get("a").unwrap(), Some(0));
}

#[test]
fn delete_removes_counter_even_when_not_found() {
    let kb = ready_kb();
    let id = kb.index(&Article::new("Temp", "gone soon"), Refresh::True).id.expect("id");
    assert!(kb.delete(&id, Refresh::True));
    assert_eq!(kb.counters().get(&id).unwrap(), None);
    assert!(kb.search("temp", None).expect("search").is_empty());

    kb.counters().inner.set("stray", 4).unwrap();
    assert!(!kb.delete("stray", Refresh::True));
    assert_eq!(kb.counters().get("stray").unwrap(), None);
}

#[test]
fn bulk_syncs_counters_for_successful_items() {
    let kb = ready_kb();
    kb.index_with_id("old", &Article::new("Old", "body"), Refresh::True);
    kb.get("old");
    let ops = vec![
        BulkOp::Index { id: Some("new".into()), article: Article::new("New", "body") },
        BulkOp::Create { id: Some("old".into()), article: Article::new("Dup", "conflict") },
        BulkOp::Delete { id: "old".into() },
    ];
    let report = kb.bulk(&ops, Refresh::True).expect("bulk");
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].status, 409);
    assert_eq!(kb.counters().get("new").unwrap(), Some(0));
    assert_eq!(kb.counters().get("old").unwrap(), None);
}

#[test]
fn staged_writes_become_visible_on_close() {
    let tmp = tempfile::tempdir().expect("tempdir");
    {
        let kb = KnowledgeBase::new(TantivyEngine::open(tmp.path()).expect("open"), MemoryCounterStore::new());
        assert!(kb.init_index(&schema()).success);
        kb.index_with_id("a", &Article::new("Deferred", "body"), Refresh::False);
        assert!(kb.search("deferred", None).expect("search").is_empty());
        kb.close();
    }
    let kb = KnowledgeBase::new(TantivyEngine::open(tmp.path()).expect("reopen"), MemoryCounterStore::new());
    assert_eq!(kb.search("deferred", None).expect("search").len(), 1);
}

#[test]
fn result_size_is_capped() {
    let kb = ready_kb().with_max_hits(2);
    for i in 0..5 {
        kb.index_with_id(&format!("doc{i}"), &Article::new("Common", format!("entry {i}")), Refresh::True);
    }
    assert_eq!(kb.search("common", None).expect("search").len(), 2);
}

#[test]
fn unrefreshed_writes_are_readable_by_id() {
    let kb = ready_kb();
    let outcome = kb.index(&Article::new("Intro", "x"), Refresh::False);
    assert!(outcome.created);
    let id = outcome.id.expect("id");
    assert_eq!(kb.get(&id).expect("staged article").title, "Intro");
    assert_eq!(kb.counters().get(&id).unwrap(), Some(1));
    assert!(kb.search("intro", None).expect("search").is_empty());

    assert!(kb.index_with_id("same", &Article::new("Same", "v1"), Refresh::False).created);
    assert!(!kb.index_with_id("same", &Article::new("Same", "v2"), Refresh::False).created);

    assert!(kb.delete(&id, Refresh::False));
    assert!(kb.get(&id).is_none());
    assert_eq!(kb.counters().get(&id).unwrap(), None);
}

#[test]
fn view_counts_survive_reconnect_with_default_settings() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut settings = Settings::default();
    settings.engine.index_dir = tmp.path().join("indexes");
    settings.counter.path = tmp.path().join("counters.json");

    let (popular, other) = {
        let kb = connect(&settings).expect("connect");
        assert!(kb.init_index(&schema()).success);
        let other = kb.index(&Article::new("Intro", "getting started"), Refresh::True).id.expect("id");
        let popular = kb.index(&Article::new("Intro", "getting started"), Refresh::True).id.expect("id");
        for _ in 0..3 {
            assert!(kb.get(&popular).is_some());
        }
        kb.close();
        (popular, other)
    };

    let kb = connect(&settings).expect("reconnect");
    assert_eq!(kb.counters().get(&popular).unwrap(), Some(3));
    assert_eq!(kb.counters().get(&other).unwrap(), Some(0));
    let ids: Vec<_> = kb.search("intro", None).expect("search").into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![popular, other]);
}
