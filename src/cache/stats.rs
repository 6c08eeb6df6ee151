//! Cache Statistics Module
//!
//! Tracks facade-level counters. Counters are atomics so concurrent requests
//! can record without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Live counters shared by all callers of a `CacheService`.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    failed_sets: AtomicU64,
    deletes: AtomicU64,
    invalidated: AtomicU64,
    circuit_rejections: AtomicU64,
    store_errors: AtomicU64,
    decode_errors: AtomicU64,
}

// == Stats Snapshot ==
/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that returned nothing (absent, degraded or undecodable)
    pub misses: u64,
    /// Writes accepted by the store
    pub sets: u64,
    /// Writes absorbed after a store failure
    pub failed_sets: u64,
    /// Keys removed by delete
    pub deletes: u64,
    /// Keys removed by pattern invalidation
    pub invalidated: u64,
    /// Operations refused by the open circuit
    pub circuit_rejections: u64,
    /// Store timeouts and errors
    pub store_errors: u64,
    /// Stored payloads that failed to decode
    pub decode_errors: u64,
}

impl StatsSnapshot {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_set(&self) {
        self.failed_sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self, count: u64) {
        self.invalidated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a store-side failure under the right bucket.
    pub fn record_store_failure(&self, circuit_open: bool) {
        if circuit_open {
            self.circuit_rejections.fetch_add(1, Ordering::Relaxed);
        } else {
            self.store_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            failed_sets: self.failed_sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            circuit_rejections: self.circuit_rejections.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}
