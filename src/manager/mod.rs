//! Cache Manager Module
//!
//! Wraps expensive computations: returns the stored result for a known call
//! signature, otherwise computes, stores and returns it. Store failures never
//! fail the call; they degrade to computing without the cache.

mod lookup;
mod single_flight;
mod stats;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{BoxError, CacheError, Result};
use crate::signature::{CacheKey, CallSignature, KeyBuilder};
use crate::store::{bounded, CacheStore};

pub use lookup::Lookup;
pub use stats::CacheStats;

use single_flight::{wait_for_leader, Flight, SingleFlight};
use stats::StatsCounters;

/// Default entry lifetime: 30 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default bound on a single store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

enum Read<T> {
    Hit(T),
    Miss,
    StoreUnavailable,
}

// == Cache Manager ==
/// Orchestrates key derivation and the store around a computation.
///
/// Only this type and the invalidation controller write to the store.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
    keys: KeyBuilder,
    default_ttl: Duration,
    store_timeout: Duration,
    single_flight: Option<SingleFlight>,
    stats: StatsCounters,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager with a 30 day default TTL, a 500ms store timeout
    /// and single-flight disabled.
    pub fn new(store: Arc<dyn CacheStore>, keys: KeyBuilder) -> Self {
        Self {
            store,
            keys,
            default_ttl: DEFAULT_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            single_flight: None,
            stats: StatsCounters::default(),
        }
    }

    /// Creates a manager with the TTL, timeout, prefix and single-flight
    /// settings from `config`.
    pub fn from_config(store: Arc<dyn CacheStore>, config: &Config) -> Self {
        Self::new(store, KeyBuilder::new(&config.key_prefix))
            .with_default_ttl(config.default_ttl())
            .with_store_timeout(config.store_timeout())
            .with_single_flight(config.single_flight)
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Enables sharing one computation between concurrent misses of a key.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled.then(SingleFlight::default);
        self
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Bound applied to each store operation.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// The key a signature is stored under.
    pub fn key_for(&self, signature: &CallSignature) -> CacheKey {
        self.keys.build(signature)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// `wrap` with the configured default TTL.
    pub async fn wrap_default<T, F, Fut, E>(
        &self,
        signature: &CallSignature,
        compute: F,
    ) -> Result<Lookup<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        self.wrap(signature, self.default_ttl, compute).await
    }

    // == Wrap ==
    /// Returns the cached result for `signature`, or runs `compute` and caches it.
    ///
    /// - A hit never invokes `compute` and performs no writes.
    /// - A failed `compute` is returned as `UpstreamComputeFailed` and nothing is cached.
    /// - A store that errors or times out on read is treated as a miss. The
    ///   write is still attempted, so one read failure does not leave the key
    ///   uncached.
    /// - A failed write is logged and the computed result is still returned.
    /// - The outcome is `MissStoreUnavailableComputed` if either the read or
    ///   the write failed.
    /// - If the returned future is dropped while `compute` runs, nothing is written.
    pub async fn wrap<T, F, Fut, E>(
        &self,
        signature: &CallSignature,
        ttl: Duration,
        compute: F,
    ) -> Result<Lookup<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        let key = self.keys.build(signature);
        let operation = signature.operation_id();

        let store_ok = match self.read::<T>(&key).await {
            Read::Hit(value) => {
                self.stats.record_hit();
                debug!(operation, key = %key, "cache hit");
                return Ok(Lookup::Hit(value));
            }
            Read::Miss => true,
            Read::StoreUnavailable => false,
        };
        self.stats.record_miss();
        debug!(operation, key = %key, "cache miss");

        let leader = match self.single_flight.as_ref().map(|f| f.join(key.as_str())) {
            Some(Flight::Follower(rx)) => {
                if let Some(payload) = wait_for_leader(rx).await {
                    if let Ok(value) = serde_json::from_str::<T>(&payload) {
                        self.stats.record_joined();
                        debug!(operation, key = %key, "joined in-flight computation");
                        return Ok(Lookup::Joined(value));
                    }
                }
                // Leader failed or was cancelled; compute independently
                None
            }
            Some(Flight::Leader(guard)) => Some(guard),
            None => None,
        };

        let value = compute()
            .await
            .map_err(|e| CacheError::UpstreamComputeFailed(e.into()))?;

        let payload = encode_payload(&value)?;

        let stored = self.write(&key, operation, &payload, ttl).await;

        if let Some(guard) = leader {
            guard.complete(payload);
        }

        if store_ok && stored {
            Ok(Lookup::MissComputed(value))
        } else {
            Ok(Lookup::MissStoreUnavailableComputed(value))
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Read<T> {
        match bounded(self.store_timeout, "get", self.store.get(key)).await {
            Ok(Some(entry)) => match serde_json::from_str(&entry.value) {
                Ok(value) => Read::Hit(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "cached payload does not decode, recomputing");
                    Read::Miss
                }
            },
            Ok(None) => Read::Miss,
            Err(e) => {
                self.stats.record_store_failure();
                warn!(
                    backend = self.store.backend(),
                    key = %key,
                    error = %e,
                    "cache read failed, computing without cache"
                );
                Read::StoreUnavailable
            }
        }
    }

    async fn write(&self, key: &CacheKey, operation: &str, payload: &str, ttl: Duration) -> bool {
        let result = bounded(
            self.store_timeout,
            "set",
            self.store.set(key, payload.to_string(), ttl),
        )
        .await;

        match result {
            Ok(()) => {
                self.stats.record_write();
                info!(operation, key = %key, ttl_secs = ttl.as_secs(), "cached response");
                true
            }
            Err(e) => {
                self.stats.record_store_failure();
                warn!(
                    backend = self.store.backend(),
                    key = %key,
                    error = %e,
                    "cache write failed, result not cached"
                );
                false
            }
        }
    }
}

/// JSON-encodes a computed value, rejecting values that would not decode
/// back (non-finite floats serialize as `null`).
fn encode_payload<T: Serialize + DeserializeOwned>(value: &T) -> Result<Arc<str>> {
    let payload =
        serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;

    serde_json::from_str::<T>(&payload).map_err(|e| {
        CacheError::Serialization(format!("computed value does not decode from JSON: {}", e))
    })?;

    Ok(payload.into())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager() -> (CacheManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(100));
        let manager = CacheManager::new(store.clone(), KeyBuilder::new("brew"));
        (manager, store)
    }

    fn guide_signature() -> CallSignature {
        CallSignature::new("guide")
            .arg("method", "V60")
            .arg("grams", 15)
            .retrieval("top_k", 3)
            .bot("model", "x")
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (manager, store) = manager();
        let sig = guide_signature();

        let first = manager
            .wrap(&sig, DEFAULT_TTL, || async { Ok::<_, BoxError>("Guide A".to_string()) })
            .await
            .unwrap();
        assert_eq!(first, Lookup::MissComputed("Guide A".to_string()));
        assert_eq!(store.len().await, 1);

        let second = manager
            .wrap(&sig, DEFAULT_TTL, || async { Ok::<_, BoxError>("Guide B".to_string()) })
            .await
            .unwrap();
        assert_eq!(second, Lookup::Hit("Guide A".to_string()));
    }

    #[tokio::test]
    async fn test_hit_never_invokes_compute() {
        let (manager, _) = manager();
        let sig = guide_signature();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            manager
                .wrap_default(&sig, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, BoxError>(vec![0.1f32, 0.2, 0.3])
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = manager.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let (manager, store) = manager();
        let sig = guide_signature();

        let result = manager
            .wrap(&sig, DEFAULT_TTL, || async {
                Err::<String, _>(BoxError::from("rate limited"))
            })
            .await;

        match result {
            Err(CacheError::UpstreamComputeFailed(e)) => assert_eq!(e.to_string(), "rate limited"),
            other => panic!("expected upstream failure, got {:?}", other),
        }
        assert!(store.is_empty().await);

        let retry = manager
            .wrap(&sig, DEFAULT_TTL, || async { Ok::<_, BoxError>("Guide A".to_string()) })
            .await
            .unwrap();
        assert!(retry.computed());
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let (manager, _) = manager();
        let sig = guide_signature();
        let ttl = Duration::from_millis(40);

        manager
            .wrap(&sig, ttl, || async { Ok::<_, BoxError>(1) })
            .await
            .unwrap();
        assert!(manager
            .wrap(&sig, ttl, || async { Ok::<_, BoxError>(2) })
            .await
            .unwrap()
            .is_hit());

        tokio::time::sleep(Duration::from_millis(70)).await;

        let after = manager
            .wrap(&sig, ttl, || async { Ok::<_, BoxError>(2) })
            .await
            .unwrap();
        assert_eq!(after, Lookup::MissComputed(2));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_recomputed() {
        let (manager, store) = manager();
        let sig = guide_signature();
        let key = manager.key_for(&sig);

        store.set(&key, "not json".to_string(), DEFAULT_TTL).await.unwrap();

        let lookup = manager
            .wrap(&sig, DEFAULT_TTL, || async { Ok::<_, BoxError>("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(lookup, Lookup::MissComputed("fresh".to_string()));
        assert_eq!(store.get(&key).await.unwrap().unwrap().value, "\"fresh\"");
    }

    #[tokio::test]
    async fn test_from_config_applies_settings() {
        let config = Config {
            key_prefix: "test".to_string(),
            ttl_days: 1,
            single_flight: true,
            ..Config::default()
        };
        let manager = CacheManager::from_config(Arc::new(MemoryStore::new(10)), &config);

        assert_eq!(manager.default_ttl(), Duration::from_secs(86_400));
        assert_eq!(manager.key_builder().prefix(), "test");
        assert!(manager.single_flight.is_some());
    }

    #[tokio::test]
    async fn test_non_finite_embedding_is_rejected_not_cached() {
        let (manager, store) = manager();
        let sig = CallSignature::new("embed_text").arg("text", "natural process");

        let result = manager
            .wrap_default(&sig, || async { Ok::<_, BoxError>(vec![0.5f32, f32::NAN]) })
            .await;

        assert!(matches!(result, Err(CacheError::Serialization(_))));
        assert!(store.is_empty().await);
        assert_eq!(manager.stats().writes, 0);
    }
}
