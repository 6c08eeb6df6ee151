//! Store Module
//!
//! The remote key/value store contract, its Redis and in-memory
//! implementations, and the circuit-breaker guarded gateway in front of them.

mod breaker;
mod entry;
mod gateway;
mod memory;
mod redis;

use async_trait::async_trait;

use crate::error::Result;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState, Permit};
pub use entry::StoredEntry;
pub use gateway::{StoreGateway, StoreOperation, StoreReply};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

// == Remote Store ==
/// Key/value service with native per-key expiry.
///
/// Implementations report failures as `StoreConnection`; timeouts and circuit
/// accounting are the gateway's job.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET key value EX ttl_seconds`
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// `DEL key [key ...]`, returning how many keys existed
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// `KEYS pattern`
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Backend name for logs
    fn name(&self) -> &'static str;
}
