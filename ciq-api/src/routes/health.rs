//! Health Check Endpoints
//!
//! Provides Kubernetes-compatible health check endpoints:
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Inventory snapshot freshness
//!
//! None of these trigger a snapshot refresh.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use ciq_storage::{CacheHealth, InventoryCache, RefreshPhase};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

impl From<CacheHealth> for HealthStatus {
    fn from(health: CacheHealth) -> Self {
        match health {
            CacheHealth::Healthy => HealthStatus::Healthy,
            CacheHealth::Degraded => HealthStatus::Degraded,
            CacheHealth::Empty => HealthStatus::Unhealthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub snapshot: SnapshotHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Freshness of the held inventory snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHealth {
    pub status: CacheHealth,
    pub phase: RefreshPhase,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
    pub max_staleness_seconds: u64,
    pub consecutive_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub refresh_policy: String,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check
///
/// 200 while a snapshot is held (healthy or degraded), 503 until the first
/// successful load.
pub async fn readiness(
    State(cache): State<Arc<InventoryCache>>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let snapshot = snapshot_health(&cache).await;
    let overall_status = HealthStatus::from(snapshot.status);

    let message = match snapshot.status {
        CacheHealth::Healthy => None,
        CacheHealth::Degraded => Some("Serving a stale inventory snapshot".to_string()),
        CacheHealth::Empty => Some("No inventory snapshot loaded yet".to_string()),
    };

    let status_code = if snapshot.status.is_serving_data() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: overall_status,
        message,
        details: Some(HealthDetails {
            snapshot,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    (status_code, Json(response))
}

async fn snapshot_health(cache: &InventoryCache) -> SnapshotHealth {
    let status = cache.status().await;
    let config = cache.config();

    SnapshotHealth {
        status: status.health(config.max_staleness),
        phase: status.phase,
        generation: status.generation,
        last_success_at: status.last_success_at,
        age_seconds: status.staleness().map(|age| age.as_secs()),
        max_staleness_seconds: config.max_staleness.as_secs(),
        consecutive_failures: status.consecutive_failures,
        last_error: status.last_error,
        refresh_policy: config.refresh_policy.to_string(),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: Some("All systems operational".to_string()),
            details: None,
        };

        let json = serde_json::to_string(&response)?;
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("details"));
        Ok(())
    }

    #[test]
    fn test_cache_health_mapping() {
        assert_eq!(HealthStatus::from(CacheHealth::Healthy), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from(CacheHealth::Degraded), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from(CacheHealth::Empty), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_snapshot_health_structure() -> Result<(), serde_json::Error> {
        let snapshot = SnapshotHealth {
            status: CacheHealth::Degraded,
            phase: RefreshPhase::Stale,
            generation: 7,
            last_success_at: None,
            age_seconds: Some(42),
            max_staleness_seconds: 300,
            consecutive_failures: 2,
            last_error: Some("Connection refused".to_string()),
            refresh_policy: "coalesced".to_string(),
        };

        let json = serde_json::to_value(&snapshot)?;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["phase"], "stale");
        assert_eq!(json["generation"], 7);
        assert!(json.get("last_success_at").is_none());
        Ok(())
    }
}
