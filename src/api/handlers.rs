//! API Handlers
//!
//! HTTP request handlers for the operator control surface.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::invalidation::InvalidationController;
use crate::manager::CacheManager;
use crate::models::{ClearResponse, HealthResponse, StatsResponse};
use crate::signature::KeyBuilder;
use crate::store::{CacheStore, MemoryStore, RedisStore};

/// Application state shared across all handlers.
///
/// The manager and the controller share one store and one key builder.
#[derive(Clone)]
pub struct AppState {
    /// Lookup path
    pub manager: Arc<CacheManager>,
    /// Operator clears
    pub invalidation: InvalidationController,
    /// The in-process store, when no persistent store is configured
    pub memory: Option<Arc<MemoryStore>>,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    ///
    /// Operator clears share the manager's store timeout.
    pub fn new(manager: CacheManager) -> Self {
        let invalidation =
            InvalidationController::new(manager.store().clone(), manager.key_builder().clone())
                .with_timeout(manager.store_timeout());

        Self {
            manager: Arc::new(manager),
            invalidation,
            memory: None,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses Redis when `redis_url` is set, the in-process store otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let keys = KeyBuilder::new(&config.key_prefix);

        let (store, memory): (Arc<dyn CacheStore>, Option<Arc<MemoryStore>>) =
            match &config.redis_url {
                Some(url) => {
                    let redis: Arc<dyn CacheStore> = Arc::new(RedisStore::new(url, keys.root())?);
                    (redis, None)
                }
                None => {
                    let memory = Arc::new(MemoryStore::new(config.max_entries));
                    (memory.clone() as Arc<dyn CacheStore>, Some(memory))
                }
            };

        let mut state = Self::new(CacheManager::from_config(store, config));
        state.memory = memory;
        Ok(state)
    }
}

/// Handler for POST /cache/clear
///
/// Removes every cached response.
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let removed = state.invalidation.clear_all().await?;
    info!(removed, "operator cleared cache");

    Ok(Json(ClearResponse::all(removed)))
}

/// Handler for DELETE /cache/namespace/:operation_id
///
/// Removes the cached responses of one operation.
pub async fn clear_namespace_handler(
    State(state): State<AppState>,
    Path(operation_id): Path<String>,
) -> Result<Json<ClearResponse>> {
    let removed = state.invalidation.clear_namespace(&operation_id).await?;

    Ok(Json(ClearResponse::namespace(operation_id, removed)))
}

/// Handler for GET /stats
///
/// Returns the manager's lookup counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.manager.store().backend(),
        state.manager.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
