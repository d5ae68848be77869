//! Response DTOs for the operator API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::manager::CacheStats;

/// Response body for the clear operations
/// (POST /cache/clear, DELETE /cache/namespace/:operation_id)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Confirmation shown to the operator
    pub message: String,
    /// The cleared operation id, absent for a full clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    /// Confirmation for a full clear
    pub fn all(removed: usize) -> Self {
        Self {
            message: format!("Cache cleared ({} entries removed)", removed),
            namespace: None,
            removed,
        }
    }

    /// Confirmation for a namespace clear
    pub fn namespace(operation_id: impl Into<String>, removed: usize) -> Self {
        let operation_id = operation_id.into();
        Self {
            message: format!(
                "Cleared '{}' ({} entries removed)",
                operation_id, removed
            ),
            namespace: Some(operation_id),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Store backend in use
    pub backend: String,
    /// Lookup counters
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a counter snapshot
    pub fn new(backend: impl Into<String>, stats: CacheStats) -> Self {
        Self {
            backend: backend.into(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_all_response_serialize() {
        let resp = ClearResponse::all(4);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["removed"], 4);
        assert!(json.get("namespace").is_none());
        assert!(json["message"].as_str().unwrap().contains("Cache cleared"));
    }

    #[test]
    fn test_clear_namespace_response_serialize() {
        let resp = ClearResponse::namespace("ask_question", 2);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["namespace"], "ask_question");
        assert_eq!(json["removed"], 2);
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let json = serde_json::to_value(StatsResponse::new("memory", stats)).unwrap();

        assert_eq!(json["hits"], 80);
        assert_eq!(json["backend"], "memory");
        assert!((json["hit_rate"].as_f64().unwrap() - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Cache store unavailable: timeout");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("unavailable"));
    }
}
