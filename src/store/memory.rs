//! Memory Store Module
//!
//! In-process store combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::signature::{CacheKey, Namespace};
use crate::store::{CacheEntry, CacheStore};

// == Access Order ==
/// Front = most recently used, back = least recently used.
#[derive(Debug, Default)]
struct AccessOrder {
    order: VecDeque<String>,
}

impl AccessOrder {
    fn touch(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    lru: AccessOrder,
    evictions: u64,
}

impl Inner {
    fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }
}

// == Memory Store ==
/// Bounded in-process store with LRU eviction and lazy TTL expiry.
///
/// Used when no persistent store is configured, and in tests.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    max_entries: usize,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store that holds at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_entries: max_entries.max(1),
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }

        expired.len()
    }

    /// Current number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries dropped to stay within capacity.
    pub async fn evictions(&self) -> u64 {
        self.inner.read().await.evictions
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        // Write lock: a hit reorders the LRU and an expired hit removes the entry
        let mut inner = self.inner.write().await;

        let expired = match inner.entries.get(key.as_str()) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(),
        };

        if expired {
            debug!(key = %key, "dropping expired entry");
            inner.remove(key.as_str());
            return Ok(None);
        }

        inner.lru.touch(key.as_str());
        Ok(inner.entries.get(key.as_str()).cloned())
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.write().await;

        let is_overwrite = inner.entries.contains_key(key.as_str());
        if !is_overwrite && inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.lru.evict_oldest() {
                inner.entries.remove(&evicted);
                inner.evictions += 1;
                debug!(key = %evicted, "evicted least recently used entry");
            }
        }

        let entry = CacheEntry::new(key.as_str(), value, ttl);
        inner.entries.insert(key.as_str().to_string(), entry);
        inner.lru.touch(key.as_str());

        Ok(())
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize> {
        let mut inner = self.inner.write().await;

        let doomed: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| namespace.contains(key))
            .cloned()
            .collect();

        for key in &doomed {
            inner.remove(key);
        }

        Ok(doomed.len())
    }

    async fn clear_all(&self) -> Result<usize> {
        let mut inner = self.inner.write().await;

        let count = inner.entries.len();
        inner.entries.clear();
        inner.lru.clear();

        Ok(count)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
