//! ClusterIQ API - HTTP Layer over the Inventory Cache
//!
//! Serves the ClusterIQ inventory (accounts, clusters, instances) over a small
//! read-only REST surface. Every inventory request refreshes the in-memory
//! snapshot from Redis first; when that fails the last known good snapshot is
//! served and the response says so through its `x-ciq-snapshot-*` headers.

mod macros;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, AppConfig, LogFormat, StoreConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::{create_api_router, InventoryJson, SNAPSHOT_GENERATION_HEADER, SNAPSHOT_STALE_HEADER};
pub use state::AppState;
