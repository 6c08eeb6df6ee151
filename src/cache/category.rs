//! Cache Category Module
//!
//! The fixed set of data classes the cache accepts. A category selects both
//! the key namespace segment and the TTL multiplier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == Category ==
/// Classification of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Session,
    Metrics,
    Benchmarks,
    Sources,
}

impl Category {
    /// Every category, in ascending TTL multiplier order.
    pub const ALL: [Category; 4] = [
        Category::Session,
        Category::Metrics,
        Category::Benchmarks,
        Category::Sources,
    ];

    /// Segment used inside cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Session => "session",
            Category::Metrics => "metrics",
            Category::Benchmarks => "benchmarks",
            Category::Sources => "sources",
        }
    }

    /// TTL multiplier. Less volatile data is cached longer.
    pub fn ttl_multiplier(&self) -> u64 {
        match self {
            Category::Session => 1,
            Category::Metrics => 2,
            Category::Benchmarks => 3,
            Category::Sources => 4,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CacheError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "session" => Ok(Category::Session),
            "metrics" => Ok(Category::Metrics),
            "benchmarks" => Ok(Category::Benchmarks),
            "sources" => Ok(Category::Sources),
            other => Err(CacheError::InvalidCategory(other.to_string())),
        }
    }
}
