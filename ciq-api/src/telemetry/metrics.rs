//! Prometheus Metrics Definitions
//!
//! Defines all ClusterIQ metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use ciq_storage::{InventoryCache, RefreshObserver, RefreshOutcome};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_gauge, CounterVec,
    Encoder, Gauge, HistogramVec, IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Snapshot fetch + decode latency buckets (seconds)
const REFRESH_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<InventoryMetrics>> = Lazy::new(InventoryMetrics::new);

/// Container for all ClusterIQ metrics.
#[derive(Clone)]
pub struct InventoryMetrics {
    /// HTTP request counter - labels: method, route, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, route
    pub http_request_duration_seconds: HistogramVec,

    /// Snapshot refresh counter - labels: outcome (loaded/coalesced/failed)
    pub snapshot_refreshes_total: CounterVec,

    /// Snapshot fetch + decode duration - labels: outcome (loaded/failed)
    pub snapshot_refresh_duration_seconds: HistogramVec,

    /// Generation of the snapshot currently held (0 = never loaded)
    pub snapshot_generation: IntGauge,

    /// Refresh failures since the last successful load
    pub snapshot_consecutive_failures: IntGauge,

    /// Seconds since the last successful load (-1 = never loaded)
    pub snapshot_age_seconds: Gauge,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl InventoryMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "ciq_http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "ciq_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "route"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            snapshot_refreshes_total: register_counter_vec!(
                "ciq_snapshot_refreshes_total",
                "Inventory snapshot refresh attempts by outcome",
                &["outcome"]
            )
            .map_err(|e| registration_error("snapshot_refreshes_total", e))?,

            snapshot_refresh_duration_seconds: register_histogram_vec!(
                "ciq_snapshot_refresh_duration_seconds",
                "Inventory snapshot fetch and decode duration in seconds",
                &["outcome"],
                REFRESH_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("snapshot_refresh_duration_seconds", e))?,

            snapshot_generation: register_int_gauge!(
                "ciq_snapshot_generation",
                "Generation of the inventory snapshot currently held"
            )
            .map_err(|e| registration_error("snapshot_generation", e))?,

            snapshot_consecutive_failures: register_int_gauge!(
                "ciq_snapshot_consecutive_failures",
                "Refresh failures since the last successful snapshot load"
            )
            .map_err(|e| registration_error("snapshot_consecutive_failures", e))?,

            snapshot_age_seconds: register_gauge!(
                "ciq_snapshot_age_seconds",
                "Seconds since the last successful snapshot load, -1 if never loaded"
            )
            .map_err(|e| registration_error("snapshot_age_seconds", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, route, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    /// Record one refresh attempt.
    pub fn record_refresh(&self, outcome: &RefreshOutcome) {
        let label = outcome.label();
        self.snapshot_refreshes_total
            .with_label_values(&[label])
            .inc();
        if let Some(elapsed) = outcome.elapsed() {
            self.snapshot_refresh_duration_seconds
                .with_label_values(&[label])
                .observe(elapsed.as_secs_f64());
        }
    }

    /// Copy the cache's refresh history into the snapshot gauges.
    pub async fn update_snapshot_gauges(&self, cache: &InventoryCache) {
        let status = cache.status().await;
        self.snapshot_generation
            .set(i64::try_from(status.generation).unwrap_or(i64::MAX));
        self.snapshot_consecutive_failures
            .set(i64::try_from(status.consecutive_failures).unwrap_or(i64::MAX));
        self.snapshot_age_seconds
            .set(status.staleness().map_or(-1.0, |age| age.as_secs_f64()));
    }
}

/// Feeds refresh outcomes from the cache into [`METRICS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshMetrics;

impl RefreshObserver for RefreshMetrics {
    fn on_refresh(&self, outcome: &RefreshOutcome) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_refresh(outcome);
        }
    }
}

/// Handler for GET /metrics endpoint.
///
/// Refreshes the snapshot gauges from the cache (without triggering a
/// refresh) and returns Prometheus text format metrics.
pub async fn metrics_handler(State(cache): State<Arc<InventoryCache>>) -> impl IntoResponse {
    match METRICS.as_ref() {
        Ok(metrics) => metrics.update_snapshot_gauges(&cache).await,
        Err(e) => tracing::error!(error = %e, "Metrics unavailable"),
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciq_core::{InventoryError, RetrievalError};
    use std::time::Duration;

    fn metrics() -> Result<&'static InventoryMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        let metrics = metrics()?;
        let before = metrics
            .http_requests_total
            .with_label_values(&["GET", "/clusters/:name", "200"])
            .get();
        metrics.record_http_request("GET", "/clusters/:name", 200, 0.015);
        let after = metrics
            .http_requests_total
            .with_label_values(&["GET", "/clusters/:name", "200"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_refresh_observer_counts_outcomes() -> Result<(), String> {
        let metrics = metrics()?;
        let failed_before = metrics
            .snapshot_refreshes_total
            .with_label_values(&["failed"])
            .get();

        RefreshMetrics.on_refresh(&RefreshOutcome::Failed {
            error: InventoryError::Retrieval(RetrievalError::Timeout {
                after: Duration::from_secs(5),
            }),
            elapsed: Duration::from_secs(5),
        });
        RefreshMetrics.on_refresh(&RefreshOutcome::Coalesced {
            generation: 1,
            succeeded: true,
        });

        let failed_after = metrics
            .snapshot_refreshes_total
            .with_label_values(&["failed"])
            .get();
        assert!(failed_after >= failed_before + 1.0);
        assert!(
            metrics
                .snapshot_refreshes_total
                .with_label_values(&["coalesced"])
                .get()
                >= 1.0
        );
        Ok(())
    }
}
