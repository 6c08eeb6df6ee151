//! In-Memory Store Module
//!
//! A [`RemoteStore`] backed by a `HashMap` behind a tokio `RwLock`. Entries
//! expire lazily on read and in bulk through [`MemoryStore::cleanup_expired`],
//! which the background cleanup task calls periodically.

use std::collections::HashMap;

use async_trait::async_trait;
use glob::Pattern;
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};
use crate::store::{RemoteStore, StoredEntry};

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Number of entries held, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it, re-checking under the write lock in case it was
        // overwritten in between
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(StoredEntry::is_expired) {
            entries.remove(key);
        }
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let entry = StoredEntry::new(value.to_string(), ttl_seconds);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count();
        Ok(removed as u64)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = Pattern::new(pattern)
            .map_err(|e| CacheError::InvalidPattern(format!("{}: {}", pattern, e)))?;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && matcher.matches(key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
