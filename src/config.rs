//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in days for entries written without an explicit TTL
    pub ttl_days: u64,
    /// Persistent store endpoint (credentials included); None selects the in-process store
    pub redis_url: Option<String>,
    /// Root namespace of every cache key
    pub key_prefix: String,
    /// Upper bound on every store operation, in milliseconds
    pub store_timeout_ms: u64,
    /// Share one computation between concurrent misses of the same key
    pub single_flight: bool,
    /// Maximum number of entries the in-process store can hold
    pub max_entries: usize,
    /// Purge interval of the in-process store, in seconds
    pub cleanup_interval: u64,
    /// Operator HTTP port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_DAYS` - Default TTL in days (default: 30)
    /// - `REDIS_URL` - Persistent store endpoint (default: unset, in-process store)
    /// - `CACHE_KEY_PREFIX` - Key prefix (default: "brew")
    /// - `STORE_TIMEOUT_MS` - Store operation timeout (default: 500)
    /// - `SINGLE_FLIGHT` - "true"/"1" to de-duplicate concurrent misses (default: false)
    /// - `MAX_ENTRIES` - In-process store capacity (default: 10000)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 60)
    /// - `SERVER_PORT` - Operator HTTP port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ttl_days: parse_var("CACHE_TTL_DAYS").unwrap_or(defaults.ttl_days),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.key_prefix),
            store_timeout_ms: parse_var("STORE_TIMEOUT_MS").unwrap_or(defaults.store_timeout_ms),
            single_flight: env::var("SINGLE_FLIGHT")
                .ok()
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.single_flight),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_days.saturating_mul(SECONDS_PER_DAY))
    }

    /// Store operation timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_days: 30,
            redis_url: None,
            key_prefix: "brew".to_string(),
            store_timeout_ms: 500,
            single_flight: false,
            max_entries: 10_000,
            cleanup_interval: 60,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.ttl_days, 30);
        assert!(config.redis_url.is_none());
        assert_eq!(config.key_prefix, "brew");
        assert_eq!(config.store_timeout_ms, 500);
        assert!(!config.single_flight);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_default_ttl_is_thirty_days() {
        let config = Config::default();
        assert_eq!(config.default_ttl(), Duration::from_secs(2_592_000));
        assert_eq!(config.store_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_TTL_DAYS");
        env::remove_var("REDIS_URL");
        env::remove_var("CACHE_KEY_PREFIX");
        env::remove_var("STORE_TIMEOUT_MS");
        env::remove_var("SINGLE_FLIGHT");

        let config = Config::from_env();
        assert_eq!(config.ttl_days, 30);
        assert!(config.redis_url.is_none());
        assert_eq!(config.key_prefix, "brew");
        assert_eq!(config.store_timeout_ms, 500);
        assert!(!config.single_flight);
    }
}
