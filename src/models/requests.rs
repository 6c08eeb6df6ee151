//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::{Deserialize, Deserializer};

use crate::cache::{CacheValue, SetOptions};

/// Request body for `PUT /cache/:category/:identifier`
///
/// # Fields
/// - `value`: The value to cache; dates use the `{"__type": "Date"}` form
/// - `ttl`: Optional base TTL in seconds (category multiplier still applies)
/// - `namespace`: Optional scoping segment
/// - `force_compress`: Compress regardless of size
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store. A missing field is `None` and rejected by the
    /// cache; an explicit `null` is `Some(CacheValue::Null)`.
    #[serde(default, deserialize_with = "present_value")]
    pub value: Option<CacheValue>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub force_compress: bool,
}

impl SetRequest {
    /// Splits the request into the value and the options the cache takes.
    pub fn into_parts(self) -> (Option<CacheValue>, SetOptions) {
        let options = SetOptions {
            ttl: self.ttl,
            namespace: self.namespace,
            force_compress: self.force_compress,
        };
        (self.value, options)
    }
}

/// Any value present in the body, `null` included. Only runs when the field
/// exists; a missing field falls back to `#[serde(default)]`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<CacheValue>, D::Error>
where
    D: Deserializer<'de>,
{
    CacheValue::deserialize(deserializer).map(Some)
}

/// `?namespace=` query accepted by get and delete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceQuery {
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Request body for `POST /invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Glob pattern, scoped to the service's key prefix
    pub pattern: String,
}
