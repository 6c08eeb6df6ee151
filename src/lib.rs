//! Bench Cache - caching core of the benchmarking service
//!
//! Collision-resistant key generation, value encoding with optional
//! compression, category-based TTLs and a circuit-breaker guarded remote
//! store, exposed through the `CacheService` facade.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheService, CacheValue, Category, SetOptions};
pub use config::{Backend, Config};
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
