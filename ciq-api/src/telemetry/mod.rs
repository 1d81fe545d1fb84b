//! ClusterIQ Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the API
//! layer and the inventory cache behind it.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, InventoryMetrics, RefreshMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{default_env_filter, init_tracing};
