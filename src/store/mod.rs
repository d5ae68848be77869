//! Store Module
//!
//! The key/value contract the cache manager is written against, plus an
//! in-process implementation and a Redis-backed persistent one.

mod entry;
mod memory;
mod redis_store;


use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheError, Result};
use crate::signature::{CacheKey, Namespace};

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

// == Cache Store Contract ==
/// Persistent key/value store with per-entry expiry.
///
/// Implementations never return an entry past its `expires_at`, and `set`
/// overwrites unconditionally (last writer wins).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live entry for `key`, or None if absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Upserts `value` under `key`, expiring `ttl` from now.
    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()>;

    /// Removes every entry whose key lies in `namespace`. Returns the count removed.
    async fn delete_namespace(&self, namespace: &Namespace) -> Result<usize>;

    /// Removes every entry owned by this cache. Returns the count removed.
    async fn clear_all(&self) -> Result<usize>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Runs a store operation under a deadline; an elapsed deadline is a store failure.
pub async fn bounded<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::StoreUnavailable(format!(
            "{} timed out after {}ms",
            operation,
            timeout.as_millis()
        ))),
    }
}
