use std::fs;

use kbase_core::error::CounterStoreError;
use kbase_core::traits::CounterStore;
use kbase_counter::FileCounterStore;
use tempfile::TempDir;

#[test]
fn counts_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("data/counters.json");
    {
        let store = FileCounterStore::open(&path).expect("open");
        assert_eq!(store.get("intro").unwrap(), None);
        store.set("intro", 0).unwrap();
        for _ in 0..3 { store.incr("intro").unwrap(); }
        store.set("gone", 5).unwrap();
        assert!(store.delete("gone").unwrap());
    }
    let store = FileCounterStore::open(&path).expect("reopen");
    assert_eq!(store.get("intro").unwrap(), Some(3));
    assert_eq!(store.get("gone").unwrap(), None);
    assert!(!store.delete("gone").unwrap());
    assert!(!tmp.path().join("data/counters.json.tmp").exists());
}

#[test]
fn malformed_file_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("counters.json");
    fs::write(&path, "{\"intro\": \"three\"}").unwrap();
    assert!(matches!(FileCounterStore::open(&path), Err(CounterStoreError::Corrupt { .. })));
}

#[test]
fn empty_file_starts_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("counters.json");
    fs::write(&path, "").unwrap();
    let store = FileCounterStore::open(&path).expect("open");
    assert_eq!(store.incr("a").unwrap(), 1);
}
