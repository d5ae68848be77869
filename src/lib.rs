//! Brew Cache - response caching for a coffee-knowledge assistant
//!
//! Derives deterministic keys from call signatures, serves repeated
//! generation, embedding and search calls from a TTL store, and falls back
//! to computing directly whenever the store is unavailable.

pub mod api;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod manager;
pub mod models;
pub mod signature;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{BoxError, CacheError, Result};
pub use invalidation::InvalidationController;
pub use manager::{CacheManager, CacheStats, Lookup};
pub use signature::{CacheKey, CallSignature, KeyBuilder};
pub use store::{CacheEntry, CacheStore, MemoryStore, RedisStore};
pub use tasks::spawn_cleanup_task;
