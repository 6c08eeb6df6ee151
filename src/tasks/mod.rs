//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the service is up.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries from the in-memory store

mod cleanup;

pub use cleanup::spawn_cleanup_task;
