//! Stored Entry Module
//!
//! A value held by the in-memory store together with its expiry deadline.

use std::time::Duration;

use tokio::time::Instant;

// == Stored Entry ==
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The encoded payload
    pub value: String,
    /// Instant at which the entry stops being visible
    pub expires_at: Instant,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl_seconds` from now.
    pub fn new(value: String, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its deadline.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
