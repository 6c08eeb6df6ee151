//! Integration Tests for the Cache Service
//!
//! Scenario tests for the facade, including behavior when the remote store
//! fails, hangs, or the circuit is open.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bench_cache::store::{CircuitState, MemoryStore, RemoteStore};
use bench_cache::{CacheError, CacheService, CacheValue, Category, Config, SetOptions};
use chrono::{TimeZone, Utc};
use tokio::time::Instant;

// == Helpers ==

/// Wraps a memory store; can be told to fail or hang, and counts calls.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    failing: AtomicBool,
    hanging: AtomicBool,
}

impl FlakyStore {
    async fn enter(&self) -> bench_cache::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::StoreConnection("connection reset".to_string()));
        }
        Ok(())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    async fn get(&self, key: &str) -> bench_cache::Result<Option<String>> {
        self.enter().await?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> bench_cache::Result<()> {
        self.enter().await?;
        self.inner.set_ex(key, value, ttl_seconds).await
    }

    async fn delete(&self, keys: &[String]) -> bench_cache::Result<u64> {
        self.enter().await?;
        self.inner.delete(keys).await
    }

    async fn keys(&self, pattern: &str) -> bench_cache::Result<Vec<String>> {
        self.enter().await?;
        self.inner.keys(pattern).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.breaker.reset_timeout = Duration::from_millis(200);
    config.breaker.operation_timeout = Duration::from_millis(100);
    config
}

fn service_over(store: Arc<FlakyStore>) -> CacheService {
    CacheService::new(&fast_config(), store).unwrap()
}

fn answer() -> CacheValue {
    CacheValue::mapping([("value", CacheValue::from(42i64))])
}

// == Scenarios ==

#[tokio::test]
async fn test_basic_set_get() {
    let cache = service_over(Arc::new(FlakyStore::default()));

    cache
        .set(Category::Metrics, "m1", Some(answer()), SetOptions::default())
        .await
        .unwrap();

    assert_eq!(
        cache.get(Category::Metrics, "m1", None).await.unwrap(),
        Some(answer())
    );
}

#[tokio::test]
async fn test_overwrite_replaces_value() {
    let cache = service_over(Arc::new(FlakyStore::default()));

    cache
        .set(Category::Metrics, "m1", Some(CacheValue::from(1i64)), SetOptions::default())
        .await
        .unwrap();
    cache
        .set(Category::Metrics, "m1", Some(CacheValue::from(2i64)), SetOptions::default())
        .await
        .unwrap();

    assert_eq!(
        cache.get(Category::Metrics, "m1", None).await.unwrap(),
        Some(CacheValue::from(2i64))
    );
}

#[tokio::test]
async fn test_nested_dates_survive_compression() {
    let store = Arc::new(FlakyStore::default());
    let cache = service_over(store.clone());
    let runs: Vec<CacheValue> = (0..200)
        .map(|i| {
            CacheValue::mapping([
                ("run", CacheValue::from(i as i64)),
                (
                    "at",
                    CacheValue::Date(Utc.timestamp_opt(1_700_000_000 + i, 5_000_000).unwrap()),
                ),
            ])
        })
        .collect();
    let value = CacheValue::mapping([("runs", CacheValue::Sequence(runs))]);

    let key = cache.key_for(Category::Benchmarks, "history", None);
    cache
        .set(Category::Benchmarks, "history", Some(value.clone()), SetOptions::default())
        .await
        .unwrap();

    let raw = store.inner.get(&key).await.unwrap().unwrap();
    assert!(raw.starts_with("__compressed__"));
    assert_eq!(
        cache.get(Category::Benchmarks, "history", None).await.unwrap(),
        Some(value)
    );
}

#[tokio::test]
async fn test_miss_after_delete() {
    let cache = service_over(Arc::new(FlakyStore::default()));

    cache
        .set(Category::Metrics, "m1", Some(answer()), SetOptions::default())
        .await
        .unwrap();
    assert!(cache.delete(Category::Metrics, "m1", None).await);

    assert_eq!(cache.get(Category::Metrics, "m1", None).await.unwrap(), None);
}

#[tokio::test]
async fn test_invalidate_pattern() {
    let cache = service_over(Arc::new(FlakyStore::default()));

    for id in ["a", "b", "c"] {
        cache
            .set(Category::Benchmarks, id, Some(answer()), SetOptions::default())
            .await
            .unwrap();
    }
    cache
        .set(Category::Sources, "a", Some(answer()), SetOptions::default())
        .await
        .unwrap();

    assert_eq!(cache.invalidate_pattern("*benchmarks:*").await.unwrap(), 3);

    for id in ["a", "b", "c"] {
        assert_eq!(cache.get(Category::Benchmarks, id, None).await.unwrap(), None);
    }
    assert!(cache.get(Category::Sources, "a", None).await.unwrap().is_some());
    assert_eq!(cache.stats().invalidated, 3);
}

#[tokio::test]
async fn test_degraded_read_when_circuit_open() {
    let store = Arc::new(FlakyStore::default());
    let cache = service_over(store.clone());
    cache.gateway().breaker().force_open().await;

    let started = Instant::now();
    let value = cache.get(Category::Metrics, "m1", None).await.unwrap();

    assert_eq!(value, None);
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(store.calls(), 0, "open circuit must not reach the store");
}

#[tokio::test]
async fn test_failures_open_circuit_then_fail_fast() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let cache = service_over(store.clone());

    for _ in 0..5 {
        assert_eq!(cache.get(Category::Metrics, "m1", None).await.unwrap(), None);
    }
    assert_eq!(cache.circuit_state().await, CircuitState::Open);
    assert_eq!(store.calls(), 5);

    assert_eq!(cache.get(Category::Metrics, "m1", None).await.unwrap(), None);
    assert_eq!(store.calls(), 5, "sixth read must fail fast");

    let stats = cache.stats();
    assert_eq!(stats.store_errors, 5);
    assert_eq!(stats.circuit_rejections, 1);
    assert_eq!(stats.misses, 6);
}

#[tokio::test]
async fn test_circuit_recovers_after_reset_timeout() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let cache = service_over(store.clone());

    for _ in 0..5 {
        let _ = cache.get(Category::Metrics, "m1", None).await;
    }
    assert_eq!(cache.circuit_state().await, CircuitState::Open);

    store.failing.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(250)).await;

    cache
        .set(Category::Metrics, "m1", Some(answer()), SetOptions::default())
        .await
        .unwrap();
    assert_eq!(store.calls(), 6, "exactly one trial reaches the store");
    assert_eq!(cache.circuit_state().await, CircuitState::Closed);
    assert_eq!(
        cache.get(Category::Metrics, "m1", None).await.unwrap(),
        Some(answer())
    );
}

#[tokio::test]
async fn test_store_failure_on_set_is_absorbed() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let cache = service_over(store);

    let result = cache
        .set(Category::Session, "s1", Some(answer()), SetOptions::default())
        .await;

    assert!(result.is_ok());
    assert_eq!(cache.stats().failed_sets, 1);
}

#[tokio::test]
async fn test_store_failure_on_delete_is_absorbed() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let cache = service_over(store);

    assert!(!cache.delete(Category::Session, "s1", None).await);
}

#[tokio::test]
async fn test_invalidate_surfaces_store_failure() {
    let store = Arc::new(FlakyStore::default());
    store.failing.store(true, Ordering::SeqCst);
    let cache = service_over(store);

    let result = cache.invalidate_pattern("*metrics:*").await;
    assert!(matches!(result, Err(CacheError::StoreConnection(_))));
}

#[tokio::test]
async fn test_slow_store_times_out_as_miss() {
    let store = Arc::new(FlakyStore::default());
    store.hanging.store(true, Ordering::SeqCst);
    let cache = service_over(store);

    let started = Instant::now();
    let value = cache.get(Category::Metrics, "m1", None).await.unwrap();

    assert_eq!(value, None);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(cache.stats().store_errors, 1);
}

#[tokio::test]
async fn test_corrupt_entry_is_an_error() {
    let store = Arc::new(FlakyStore::default());
    let cache = service_over(store.clone());
    let key = cache.key_for(Category::Metrics, "m1", None);
    store.inner.set_ex(&key, "__compressed__not-base64!", 60).await.unwrap();

    let result = cache.get(Category::Metrics, "m1", None).await;
    assert!(matches!(result, Err(CacheError::Deserialization(_))));
    assert_eq!(cache.stats().decode_errors, 1);
}

#[tokio::test]
async fn test_concurrent_writers_do_not_interfere() {
    let cache = Arc::new(service_over(Arc::new(FlakyStore::default())));

    let handles: Vec<_> = (0..32i64)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move {
                let id = format!("m{}", i);
                cache
                    .set(Category::Metrics, &id, Some(CacheValue::from(i)), SetOptions::default())
                    .await
                    .unwrap();
                cache.get(Category::Metrics, &id, None).await.unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), Some(CacheValue::from(i as i64)));
    }
    assert_eq!(cache.stats().sets, 32);
}
