//! Error types for the cache core
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache core.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Category outside the fixed enumeration
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Invalidation pattern contains characters the store would interpret
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Value cannot be encoded for the store
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored payload is malformed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Circuit breaker rejected the operation without contacting the store
    #[error("Circuit open: store considered unhealthy")]
    CircuitOpen,

    /// Store operation exceeded the per-operation timeout
    #[error("Store timeout after {0:?}")]
    StoreTimeout(Duration),

    /// Store reported an error or is unreachable
    #[error("Store error: {0}")]
    StoreConnection(String),

    /// No cached entry for the requested key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for failures of the backing store (including the breaker
    /// refusing to reach it), as opposed to errors caused by caller input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CacheError::CircuitOpen | CacheError::StoreTimeout(_) | CacheError::StoreConnection(_)
        )
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::StoreConnection(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidCategory(_)
            | CacheError::InvalidPattern(_)
            | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::CircuitOpen
            | CacheError::StoreTimeout(_)
            | CacheError::StoreConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Deserialization(_) | CacheError::Config(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache core.
pub type Result<T> = std::result::Result<T, CacheError>;
