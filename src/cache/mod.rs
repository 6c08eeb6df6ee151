//! Cache Module
//!
//! Key and value codecs, the TTL policy and the `CacheService` facade that
//! composes them over the store gateway.

mod category;
mod codec;
mod key;
mod service;
mod stats;
mod ttl;
mod value;


// Re-export public types
pub use category::Category;
pub use codec::ValueCodec;
pub use key::KeyCodec;
pub use service::{CacheService, SetOptions};
pub use stats::{CacheStats, StatsSnapshot};
pub use ttl::TtlPolicy;
pub use value::CacheValue;

// == Public Constants ==
/// Maximum length of a cache key in bytes
pub const MAX_KEY_LENGTH: usize = 200;

/// Maximum length of the global key prefix in bytes
pub const MAX_PREFIX_LENGTH: usize = 32;

/// Namespace segments longer than this are truncated and fingerprinted
pub const MAX_NAMESPACE_LENGTH: usize = 64;

/// Canonical size in bytes above which values are compressed
pub const COMPRESSION_THRESHOLD: usize = 1024;

/// Prefix marking a compressed payload
pub const COMPRESSION_MARKER: &str = "__compressed__";

/// Base TTL in seconds when the caller does not request one
pub const DEFAULT_BASE_TTL: u64 = 300;

/// Lower bound of every effective TTL (1 minute)
pub const MIN_TTL: u64 = 60;

/// Upper bound of every effective TTL (24 hours)
pub const MAX_TTL: u64 = 86_400;

/// Payloads larger than this are encoded and decoded on the blocking pool
pub const BLOCKING_CODEC_THRESHOLD: usize = 64 * 1024;
