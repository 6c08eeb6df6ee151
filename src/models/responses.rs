//! Response DTOs for the cache admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheValue, StatsSnapshot};
use crate::store::CircuitState;

/// Response body for `GET /cache/:category/:identifier`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The store key the value was read from
    pub key: String,
    /// The cached value
    pub value: CacheValue,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: CacheValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /cache/:category/:identifier`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The store key written
    pub key: String,
    /// Effective TTL in seconds
    pub ttl: u64,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, ttl: u64) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set for {}s", key, ttl),
            key,
            ttl,
        }
    }
}

/// Response body for `DELETE /cache/:category/:identifier`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// The store key targeted
    pub key: String,
    /// Whether an entry was removed
    pub removed: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        Self {
            key: key.into(),
            removed,
        }
    }
}

/// Response body for `POST /invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The pattern as received
    pub pattern: String,
    /// Number of keys deleted
    pub deleted: u64,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Current breaker state
    pub circuit: CircuitState,
    /// Remote store implementation in use
    pub backend: &'static str,
}

impl StatsResponse {
    pub fn new(counters: StatsSnapshot, circuit: CircuitState, backend: &'static str) -> Self {
        Self {
            hit_rate: counters.hit_rate(),
            counters,
            circuit,
            backend,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy` while the circuit is closed, `degraded` otherwise
    pub status: String,
    pub circuit: CircuitState,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn from_circuit(circuit: CircuitState) -> Self {
        let status = match circuit {
            CircuitState::Closed => "healthy",
            CircuitState::Open | CircuitState::HalfOpen => "degraded",
        };
        Self {
            status: status.to_string(),
            circuit,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
