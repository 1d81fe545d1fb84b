//! Axum middleware recording Prometheus metrics for every HTTP request.
//!
//! Request spans come from `tower_http::trace::TraceLayer`; this layer only
//! measures.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::metrics::METRICS;

/// Route label for a request: the matched route template, so that
/// `/accounts/acct1` and `/accounts/acct2` share one series.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Record request count and latency by method, route and status.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = route_label(&request);

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &route,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::debug!(
        method = %method,
        route = %route,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
