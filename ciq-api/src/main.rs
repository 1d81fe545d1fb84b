//! ClusterIQ API Server Entry Point
//!
//! Bootstraps logging and configuration, builds the Redis snapshot client and
//! the inventory cache, and starts the Axum HTTP server.

use std::sync::Arc;

use ciq_api::telemetry::{init_tracing, RefreshMetrics};
use ciq_api::{create_api_router, ApiError, ApiResult, AppConfig, AppState, LogFormat};
use ciq_storage::{InventoryCache, RedisSnapshotClient, SnapshotSource};

const COMMIT: &str = match option_env!("CIQ_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(LogFormat::from_env())?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = COMMIT,
        "Starting ClusterIQ API"
    );

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let addr = config.api.bind_addr()?;
    tracing::info!(
        api_address = %addr,
        db_address = %config.store.address(),
        db_index = config.store.database,
        db_key = %config.store.key,
        db_auth = config.store.password.is_some(),
        refresh_policy = %config.cache.refresh_policy,
        fetch_timeout_ms = config.cache.fetch_timeout.as_millis() as u64,
        "Configuration loaded"
    );

    let source: Arc<dyn SnapshotSource> =
        Arc::new(RedisSnapshotClient::new(config.store.redis_config()));
    let cache = InventoryCache::new(source, config.cache).with_observer(Arc::new(RefreshMetrics));

    let app = create_api_router(AppState::new(Arc::new(cache)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Can't listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
