//! REST API Routes Module
//!
//! Includes:
//! - Inventory routes (accounts, clusters, instances)
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics
//! - CORS support for browser-based clients

pub mod accounts;
pub mod clusters;
pub mod health;
pub mod instances;

use axum::{
    http::{header::HeaderName, HeaderValue, Method, Uri},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ciq_storage::SnapshotRead;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use accounts::create_router as accounts_router;
pub use clusters::create_router as clusters_router;
pub use health::create_router as health_router;
pub use instances::create_router as instances_router;

/// Generation of the snapshot an inventory response was computed from.
pub const SNAPSHOT_GENERATION_HEADER: HeaderName =
    HeaderName::from_static("x-ciq-snapshot-generation");

/// `true` when the refresh for this request failed and the last known good
/// snapshot was served.
pub const SNAPSHOT_STALE_HEADER: HeaderName = HeaderName::from_static("x-ciq-snapshot-stale");

// ============================================================================
// INVENTORY RESPONSE
// ============================================================================

/// JSON body plus the snapshot headers of the read it came from.
#[derive(Debug)]
pub struct InventoryJson<B> {
    generation: u64,
    stale: bool,
    body: B,
}

impl<B: Serialize> InventoryJson<B> {
    /// Build a response body from a cache read.
    pub fn from_read<T>(read: SnapshotRead<T>, into_body: impl FnOnce(T) -> B) -> Self {
        let generation = read.generation();
        let stale = read.is_stale();
        Self {
            generation,
            stale,
            body: into_body(read.into_value()),
        }
    }
}

impl<B: Serialize> IntoResponse for InventoryJson<B> {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(SNAPSHOT_GENERATION_HEADER, HeaderValue::from(self.generation));
        headers.insert(
            SNAPSHOT_STALE_HEADER,
            HeaderValue::from_static(if self.stale { "true" } else { "false" }),
        );
        response
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the CORS layer.
///
/// The inventory is public and read-only: any origin may issue GETs and read
/// the snapshot headers.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([SNAPSHOT_GENERATION_HEADER, SNAPSHOT_STALE_HEADER])
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::route_not_found(uri.path())
}

/// Create the complete API router.
///
/// - `/accounts`, `/accounts/:name`
/// - `/clusters`, `/clusters/:name`
/// - `/instances`
/// - `/health/ping`, `/health/live`, `/health/ready`
/// - `/metrics`
///
/// # Middleware Order (outer to inner)
/// 1. CORS
/// 2. HTTP tracing spans
/// 3. Request metrics
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .nest("/accounts", accounts::create_router())
        .nest("/clusters", clusters::create_router())
        .nest("/instances", instances::create_router())
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .fallback(fallback)
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}
