//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{COMPRESSION_THRESHOLD, DEFAULT_BASE_TTL, MAX_PREFIX_LENGTH};
use crate::error::{CacheError, Result};
use crate::store::BreakerConfig;

// == Backend ==
/// Which remote store the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Redis,
}

impl FromStr for Backend {
    type Err = CacheError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "redis" => Ok(Backend::Redis),
            other => Err(CacheError::Config(format!("Unknown cache backend: {}", other))),
        }
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Remote store implementation
    pub backend: Backend,
    /// Redis connection URL, credentials included
    pub redis_url: String,
    /// Prefix of every cache key
    pub key_prefix: String,
    /// Base TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Canonical size in bytes above which values are compressed
    pub compression_threshold: usize,
    /// Sweep interval in seconds for the in-memory backend
    pub cleanup_interval: u64,
    /// Circuit breaker and per-operation timeout settings
    pub breaker: BreakerConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: memory)
    /// - `REDIS_URL` - Redis URL (default: redis://127.0.0.1:6379)
    /// - `CACHE_KEY_PREFIX` - Global key prefix (default: bench:)
    /// - `DEFAULT_TTL` - Base TTL in seconds (default: 300)
    /// - `COMPRESSION_THRESHOLD` - Compression threshold in bytes (default: 1024)
    /// - `CLEANUP_INTERVAL` - Memory backend sweep in seconds (default: 1)
    /// - `BREAKER_FAILURE_THRESHOLD` - Failure percentage that opens the circuit (default: 50)
    /// - `BREAKER_MIN_SAMPLES` - Outcomes needed before evaluating (default: 5)
    /// - `BREAKER_WINDOW_MS` - Rolling window span (default: 10000)
    /// - `BREAKER_RESET_TIMEOUT_MS` - Open time before a trial (default: 30000)
    /// - `STORE_OP_TIMEOUT_MS` - Per-operation timeout (default: 3000)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let breaker = BreakerConfig {
            failure_threshold: parse_env("BREAKER_FAILURE_THRESHOLD")
                .unwrap_or(defaults.breaker.failure_threshold),
            min_samples: parse_env("BREAKER_MIN_SAMPLES").unwrap_or(defaults.breaker.min_samples),
            window: parse_env("BREAKER_WINDOW_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.breaker.window),
            reset_timeout: parse_env("BREAKER_RESET_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.breaker.reset_timeout),
            operation_timeout: parse_env("STORE_OP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.breaker.operation_timeout),
        };

        let backend = match env::var("CACHE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        let config = Self {
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            backend,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            compression_threshold: parse_env("COMPRESSION_THRESHOLD")
                .unwrap_or(defaults.compression_threshold),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            breaker,
        };
        config.validate()?;
        Ok(config)
    }

    // == Validate ==
    /// Rejects settings the cache cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.len() > MAX_PREFIX_LENGTH {
            return Err(CacheError::Config(format!(
                "CACHE_KEY_PREFIX exceeds maximum length of {} bytes",
                MAX_PREFIX_LENGTH
            )));
        }
        if !(1..=100).contains(&self.breaker.failure_threshold) {
            return Err(CacheError::Config(
                "BREAKER_FAILURE_THRESHOLD must be between 1 and 100".to_string(),
            ));
        }
        if self.breaker.window.is_zero() {
            return Err(CacheError::Config(
                "BREAKER_WINDOW_MS must be greater than zero".to_string(),
            ));
        }
        if self.breaker.operation_timeout.is_zero() {
            return Err(CacheError::Config(
                "STORE_OP_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_interval == 0 {
            return Err(CacheError::Config(
                "CLEANUP_INTERVAL must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads and parses `name`. A value that is set but unparsable is logged
/// and treated as unset.
fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value, using default", name, raw);
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            backend: Backend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "bench:".to_string(),
            default_ttl: DEFAULT_BASE_TTL,
            compression_threshold: COMPRESSION_THRESHOLD,
            cleanup_interval: 1,
            breaker: BreakerConfig::default(),
        }
    }
}
