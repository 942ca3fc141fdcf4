//! Runs against a live server only when `KBASE_TEST_REDIS_URL` is set.
use kbase_core::error::CounterStoreError;
use kbase_core::traits::CounterStore;
use kbase_counter::RedisCounterStore;

fn live_store(prefix: &str) -> Option<RedisCounterStore> {
    let url = std::env::var("KBASE_TEST_REDIS_URL").ok()?;
    Some(RedisCounterStore::connect(&url, prefix).expect("connect to test redis"))
}

#[test]
fn redis_counter_lifecycle() {
    let Some(store) = live_store("kbase-test:lifecycle:") else { return };
    store.delete("intro").expect("clean");
    assert_eq!(store.get("intro").expect("get"), None);
    store.set("intro", 0).expect("set");
    assert_eq!(store.incr("intro").expect("incr"), 1);
    assert_eq!(store.incr("intro").expect("incr"), 2);
    assert_eq!(store.get("intro").expect("get"), Some(2));
    assert!(store.delete("intro").expect("delete"));
    assert!(!store.delete("intro").expect("delete again"));
}

#[test]
fn redis_non_integer_counter_is_corrupt() {
    let Some(store) = live_store("kbase-test:corrupt:") else { return };
    let url = std::env::var("KBASE_TEST_REDIS_URL").expect("url");
    let mut conn = redis::Client::open(url.as_str()).expect("client").get_connection().expect("conn");
    redis::cmd("SET").arg(store.key("bad")).arg("not-a-number").query::<()>(&mut conn).expect("seed");
    assert!(matches!(store.get("bad"), Err(CounterStoreError::Corrupt { .. })));
    assert!(matches!(store.incr("bad"), Err(CounterStoreError::Corrupt { .. })));
    store.delete("bad").expect("clean");
}

#[test]
fn unreachable_redis_fails_to_connect() {
    let err = RedisCounterStore::connect("redis://127.0.0.1:1/", "").err().expect("connection should fail");
    assert!(matches!(err, CounterStoreError::Unreachable(_)));
}
