//! Invalidation Module
//!
//! Operator-facing clears. Kept apart from the manager so access control or
//! auditing can wrap it without touching the lookup path. Unlike lookups,
//! failures here are returned to the caller: there is no safe fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::error::{CacheError, Result};
use crate::manager::DEFAULT_STORE_TIMEOUT;
use crate::signature::KeyBuilder;
use crate::store::{bounded, CacheStore};

// == Invalidation Controller ==
/// Namespace-scoped and full cache clears.
#[derive(Clone)]
pub struct InvalidationController {
    store: Arc<dyn CacheStore>,
    keys: KeyBuilder,
    timeout: Duration,
}

impl InvalidationController {
    /// `keys` must be the builder the manager uses, or the prefixes will not match.
    pub fn new(store: Arc<dyn CacheStore>, keys: KeyBuilder) -> Self {
        Self {
            store,
            keys,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound on each clear. Full scans of a large store need more than a lookup.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // == Clear Namespace ==
    /// Removes every entry cached for `operation_id`. Returns the count removed.
    pub async fn clear_namespace(&self, operation_id: &str) -> Result<usize> {
        if operation_id.trim().is_empty() {
            return Err(CacheError::InvalidRequest(
                "operation id cannot be empty".to_string(),
            ));
        }

        let namespace = self.keys.namespace(operation_id);
        let result = bounded(
            self.timeout,
            "delete_namespace",
            self.store.delete_namespace(&namespace),
        )
        .await;

        match result {
            Ok(removed) => {
                info!(operation_id, removed, "cleared cache namespace");
                Ok(removed)
            }
            Err(e) => {
                error!(operation_id, error = %e, "failed to clear cache namespace");
                Err(e)
            }
        }
    }

    // == Clear All ==
    /// Removes every entry this cache owns. Returns the count removed.
    pub async fn clear_all(&self) -> Result<usize> {
        match bounded(self.timeout, "clear_all", self.store.clear_all()).await {
            Ok(removed) => {
                info!(removed, backend = self.store.backend(), "cache cleared");
                Ok(removed)
            }
            Err(e) => {
                error!(error = %e, backend = self.store.backend(), "failed to clear cache");
                Err(e)
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::CallSignature;
    use crate::store::MemoryStore;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn seeded() -> (InvalidationController, Arc<MemoryStore>, KeyBuilder) {
        let store = Arc::new(MemoryStore::new(100));
        let keys = KeyBuilder::new("brew");

        for (op, method) in [
            ("generate_brewing_guide", "V60"),
            ("generate_brewing_guide", "Chemex"),
            ("ask_question", "V60"),
        ] {
            let key = keys.build(&CallSignature::new(op).arg("method", method));
            store.set(&key, "\"x\"".to_string(), HOUR).await.unwrap();
        }

        let controller = InvalidationController::new(store.clone(), keys.clone());
        (controller, store, keys)
    }

    #[tokio::test]
    async fn test_clear_namespace_is_scoped() {
        let (controller, store, keys) = seeded().await;

        let removed = controller.clear_namespace("generate_brewing_guide").await.unwrap();

        assert_eq!(removed, 2);
        let survivor = keys.build(&CallSignature::new("ask_question").arg("method", "V60"));
        assert!(store.get(&survivor).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_unknown_namespace_removes_nothing() {
        let (controller, store, _) = seeded().await;

        assert_eq!(controller.clear_namespace("embed_text").await.unwrap(), 0);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_clear_namespace_rejects_empty() {
        let (controller, _, _) = seeded().await;

        let result = controller.clear_namespace("  ").await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (controller, store, _) = seeded().await;

        assert_eq!(controller.clear_all().await.unwrap(), 3);
        assert!(store.is_empty().await);
    }
}
