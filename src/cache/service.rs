//! Cache Service Module
//!
//! The facade calling code uses. Each call names its entry with the key
//! codec, sizes its lifetime with the TTL policy, encodes or decodes the
//! payload with the value codec and performs I/O through the store gateway.
//!
//! Store trouble never breaks the caller: reads degrade to a miss and writes
//! are logged and dropped. Only caller mistakes (absent value, bad pattern)
//! and corrupt payloads are returned as errors.

use std::sync::Arc;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{
    CacheStats, CacheValue, Category, KeyCodec, StatsSnapshot, TtlPolicy, ValueCodec,
    BLOCKING_CODEC_THRESHOLD,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::{CircuitState, RemoteStore, StoreGateway};

// == Set Options ==
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetOptions {
    /// Base TTL in seconds before the category multiplier
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Extra scoping segment for the key
    #[serde(default)]
    pub namespace: Option<String>,
    /// Compress regardless of size
    #[serde(default)]
    pub force_compress: bool,
}

// == Cache Service ==
pub struct CacheService {
    keys: KeyCodec,
    codec: ValueCodec,
    ttl: TtlPolicy,
    gateway: StoreGateway,
    stats: CacheStats,
}

impl CacheService {
    // == Constructor ==
    /// Builds the service over `store` with settings taken from `config`.
    pub fn new(config: &Config, store: Arc<dyn RemoteStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            keys: KeyCodec::new(config.key_prefix.clone())?,
            codec: ValueCodec::new(config.compression_threshold),
            ttl: TtlPolicy::new(config.default_ttl),
            gateway: StoreGateway::new(store, config.breaker.clone()),
            stats: CacheStats::new(),
        })
    }

    // == Get ==
    /// Returns the cached value, or `None` on a miss.
    ///
    /// An unreachable store or open circuit is reported as a miss.
    pub async fn get(
        &self,
        category: Category,
        identifier: &str,
        namespace: Option<&str>,
    ) -> Result<Option<CacheValue>> {
        let started = Instant::now();
        let key = self.keys.make_key(category, identifier, namespace);

        let payload = match self.gateway.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.stats.record_miss();
                trace("get (miss)", &key, started);
                return Ok(None);
            }
            Err(err) if err.is_infrastructure() => {
                self.stats
                    .record_store_failure(matches!(err, CacheError::CircuitOpen));
                self.stats.record_miss();
                debug!("cache get {} degraded to miss: {}", key, err);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let decoded = self.decode(payload).await;
        trace("get", &key, started);
        match decoded {
            Ok(Some(value)) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            Ok(None) => {
                self.stats.record_miss();
                Ok(None)
            }
            Err(err) => {
                self.stats.record_decode_error();
                warn!("cache entry {} could not be decoded: {}", key, err);
                Err(err)
            }
        }
    }

    // == Set ==
    /// Stores `value` under the entry's key.
    ///
    /// Fails only for an absent value or an encoding failure. Store failures
    /// are logged and swallowed.
    pub async fn set(
        &self,
        category: Category,
        identifier: &str,
        value: Option<CacheValue>,
        options: SetOptions,
    ) -> Result<()> {
        let started = Instant::now();
        let key = self
            .keys
            .make_key(category, identifier, options.namespace.as_deref());
        let payload = self.encode(value, options.force_compress).await?;
        let ttl_seconds = self.ttl.compute_ttl(category, options.ttl);

        match self.gateway.set(&key, payload, ttl_seconds).await {
            Ok(()) => {
                self.stats.record_set();
                trace("set", &key, started);
                Ok(())
            }
            Err(err) if err.is_infrastructure() => {
                self.stats
                    .record_store_failure(matches!(err, CacheError::CircuitOpen));
                self.stats.record_failed_set();
                warn!("cache set {} dropped: {}", key, err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // == Delete ==
    /// Removes the entry. Best effort: returns whether something was removed
    /// and never fails.
    pub async fn delete(&self, category: Category, identifier: &str, namespace: Option<&str>) -> bool {
        let started = Instant::now();
        let key = self.keys.make_key(category, identifier, namespace);

        let removed = match self.gateway.delete(&key).await {
            Ok(count) => {
                self.stats.record_deletes(count);
                count > 0
            }
            Err(err) => {
                if err.is_infrastructure() {
                    self.stats
                        .record_store_failure(matches!(err, CacheError::CircuitOpen));
                }
                warn!("cache delete {} failed: {}", key, err);
                false
            }
        };
        trace("delete", &key, started);
        removed
    }

    // == Invalidate Pattern ==
    /// Deletes every key under this service's prefix matching `pattern`
    /// and returns how many were removed.
    ///
    /// Unlike `set`/`delete`, store failures are returned: callers rely on
    /// invalidation to drop stale derived data.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64> {
        let started = Instant::now();
        let scoped = self.keys.scoped_pattern(pattern)?;

        match self.gateway.delete_pattern(&scoped).await {
            Ok(count) => {
                self.stats.record_invalidated(count);
                trace("invalidate", &scoped, started);
                Ok(count)
            }
            Err(err) => {
                if err.is_infrastructure() {
                    self.stats
                        .record_store_failure(matches!(err, CacheError::CircuitOpen));
                }
                warn!("cache invalidate {} failed: {}", scoped, err);
                Err(err)
            }
        }
    }

    // == Accessors ==
    /// Key the entry is stored under.
    pub fn key_for(&self, category: Category, identifier: &str, namespace: Option<&str>) -> String {
        self.keys.make_key(category, identifier, namespace)
    }

    /// Effective TTL for the category.
    pub fn ttl_for(&self, category: Category, requested_base: Option<u64>) -> u64 {
        self.ttl.compute_ttl(category, requested_base)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.gateway.circuit_state().await
    }

    pub fn gateway(&self) -> &StoreGateway {
        &self.gateway
    }

    // == Codec Offload ==
    async fn encode(&self, value: Option<CacheValue>, force_compress: bool) -> Result<String> {
        let codec = self.codec;
        match value {
            Some(value) if value.estimated_size() > BLOCKING_CODEC_THRESHOLD => {
                tokio::task::spawn_blocking(move || codec.encode(Some(&value), force_compress))
                    .await
                    .map_err(|e| CacheError::Internal(format!("encode task failed: {}", e)))?
            }
            value => codec.encode(value.as_ref(), force_compress),
        }
    }

    async fn decode(&self, payload: String) -> Result<Option<CacheValue>> {
        let codec = self.codec;
        if payload.len() > BLOCKING_CODEC_THRESHOLD {
            tokio::task::spawn_blocking(move || codec.decode(&payload))
                .await
                .map_err(|e| CacheError::Internal(format!("decode task failed: {}", e)))?
        } else {
            codec.decode(&payload)
        }
    }
}

fn trace(operation: &str, key: &str, started: Instant) {
    debug!("cache {} {} in {:?}", operation, key, started.elapsed());
}
