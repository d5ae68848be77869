//! Redis Store Module
//!
//! Persistent store backed by Redis. Entries are JSON-encoded `CacheEntry`
//! records written with a millisecond expiry, so Redis drops them on its own.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::signature::{CacheKey, Namespace};
use crate::store::{CacheEntry, CacheStore};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 500;

// == Redis Store ==
/// Redis-backed store. `clear_all` only touches keys under `root`, so the
/// server can be shared with other data.
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: redis::Client,
    root: Namespace,
}

impl RedisStore {
    /// Creates a store for the given connection URL (credentials included).
    ///
    /// No connection is made until the first operation.
    pub fn new(url: &str, root: Namespace) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::StoreUnavailable(format!("invalid store URL: {}", e)))?;

        Ok(Self { client, root })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::StoreUnavailable(format!("connection failed: {}", e)))
    }

    // SCAN + DEL in batches; never KEYS, which blocks the server.
    async fn delete_matching(&self, namespace: &Namespace) -> Result<usize> {
        let mut conn = self.connection().await?;
        let pattern = match_pattern(namespace.as_prefix());
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: usize = conn.del(&keys).await?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(namespace = %namespace, removed, "deleted keys by pattern");
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(key.as_str()).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.is_expired() => Ok(None),
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // Written by something else or an older format; let the caller recompute
                warn!(key = %key, error = %e, "ignoring undecodable stored entry");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(key.as_str(), value, ttl);
        let data =
            serde_json::to_string(&entry).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let mut conn = self.connection().await?;
        let _: () = conn.pset_ex(key.as_str(), data, ttl_ms).await?;

        Ok(())
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize> {
        self.delete_matching(namespace).await
    }

    async fn clear_all(&self) -> Result<usize> {
        self.delete_matching(&self.root).await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Glob pattern matching every key that starts with `prefix` literally.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}
