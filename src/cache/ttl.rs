//! TTL Policy Module
//!
//! Effective lifetime = base TTL x category multiplier, clamped to
//! `[MIN_TTL, MAX_TTL]`.

use crate::cache::{Category, DEFAULT_BASE_TTL, MAX_TTL, MIN_TTL};

// == TTL Policy ==
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    /// Base TTL in seconds used when the caller does not request one
    default_base: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_TTL)
    }
}

impl TtlPolicy {
    pub fn new(default_base: u64) -> Self {
        Self { default_base }
    }

    // == Compute TTL ==
    /// Returns the effective TTL in seconds, always within `[60, 86400]`.
    pub fn compute_ttl(&self, category: Category, requested_base: Option<u64>) -> u64 {
        requested_base
            .unwrap_or(self.default_base)
            .saturating_mul(category.ttl_multiplier())
            .clamp(MIN_TTL, MAX_TTL)
    }
}
