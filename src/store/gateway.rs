//! Store Gateway Module
//!
//! Every store operation goes through [`StoreGateway::execute`]: the circuit
//! breaker admits it, the operation runs under the per-operation timeout, and
//! the outcome is reported back to the breaker.
//!
//! A timed-out operation's future is dropped, so a late reply from the store
//! is discarded instead of being awaited.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::store::{BreakerConfig, CircuitBreaker, CircuitState, RemoteStore};

// == Store Operation ==
/// A single physical store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    Get { key: String },
    Set { key: String, value: String, ttl_seconds: u64 },
    Delete { keys: Vec<String> },
    /// Enumerates keys matching a glob and deletes them in one operation
    DeletePattern { pattern: String },
}

impl StoreOperation {
    fn name(&self) -> &'static str {
        match self {
            StoreOperation::Get { .. } => "get",
            StoreOperation::Set { .. } => "set",
            StoreOperation::Delete { .. } => "delete",
            StoreOperation::DeletePattern { .. } => "delete_pattern",
        }
    }
}

// == Store Reply ==
#[derive(Debug, Clone, PartialEq)]
pub enum StoreReply {
    Value(Option<String>),
    Stored,
    Deleted(u64),
}

// == Store Gateway ==
pub struct StoreGateway {
    store: Arc<dyn RemoteStore>,
    breaker: CircuitBreaker,
    operation_timeout: Duration,
}

impl StoreGateway {
    // == Constructor ==
    pub fn new(store: Arc<dyn RemoteStore>, config: BreakerConfig) -> Self {
        let operation_timeout = config.operation_timeout;
        Self {
            store,
            breaker: CircuitBreaker::new(config),
            operation_timeout,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.breaker.state().await
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    // == Execute ==
    /// Runs one operation through the breaker and the timeout.
    ///
    /// Fails with `CircuitOpen` without touching the store while the circuit
    /// refuses traffic, `StoreTimeout` when the deadline passes and
    /// `StoreConnection` when the store reports an error.
    pub async fn execute(&self, operation: StoreOperation) -> Result<StoreReply> {
        let permit = self.breaker.acquire().await?;
        let started = Instant::now();

        match timeout(self.operation_timeout, self.run(&operation)).await {
            Ok(Ok(reply)) => {
                self.breaker.record_success(permit).await;
                debug!(
                    "store {} ok in {:?}",
                    operation.name(),
                    started.elapsed()
                );
                Ok(reply)
            }
            Ok(Err(err)) if err.is_infrastructure() => {
                self.breaker.record_failure(permit).await;
                warn!("store {} failed: {}", operation.name(), err);
                Err(err)
            }
            Ok(Err(err)) => {
                self.breaker.release(permit).await;
                Err(err)
            }
            Err(_) => {
                self.breaker.record_failure(permit).await;
                warn!(
                    "store {} timed out after {:?}",
                    operation.name(),
                    self.operation_timeout
                );
                Err(CacheError::StoreTimeout(self.operation_timeout))
            }
        }
    }

    async fn run(&self, operation: &StoreOperation) -> Result<StoreReply> {
        match operation {
            StoreOperation::Get { key } => self.store.get(key).await.map(StoreReply::Value),
            StoreOperation::Set {
                key,
                value,
                ttl_seconds,
            } => self
                .store
                .set_ex(key, value, *ttl_seconds)
                .await
                .map(|_| StoreReply::Stored),
            StoreOperation::Delete { keys } => {
                self.store.delete(keys).await.map(StoreReply::Deleted)
            }
            StoreOperation::DeletePattern { pattern } => {
                let keys = self.store.keys(pattern).await?;
                if keys.is_empty() {
                    return Ok(StoreReply::Deleted(0));
                }
                self.store.delete(&keys).await.map(StoreReply::Deleted)
            }
        }
    }

    // == Typed Helpers ==
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.execute(StoreOperation::Get { key: key.to_string() }).await? {
            StoreReply::Value(value) => Ok(value),
            other => Err(unexpected("get", other)),
        }
    }

    pub async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()> {
        let operation = StoreOperation::Set {
            key: key.to_string(),
            value,
            ttl_seconds,
        };
        match self.execute(operation).await? {
            StoreReply::Stored => Ok(()),
            other => Err(unexpected("set", other)),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<u64> {
        let operation = StoreOperation::Delete {
            keys: vec![key.to_string()],
        };
        match self.execute(operation).await? {
            StoreReply::Deleted(count) => Ok(count),
            other => Err(unexpected("delete", other)),
        }
    }

    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let operation = StoreOperation::DeletePattern {
            pattern: pattern.to_string(),
        };
        match self.execute(operation).await? {
            StoreReply::Deleted(count) => Ok(count),
            other => Err(unexpected("delete_pattern", other)),
        }
    }
}

fn unexpected(operation: &str, reply: StoreReply) -> CacheError {
    CacheError::Internal(format!("unexpected reply to {}: {:?}", operation, reply))
}
