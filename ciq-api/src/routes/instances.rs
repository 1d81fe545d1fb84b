//! Instance routes.

use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use ciq_core::InstanceListResponse;
use ciq_storage::InventoryCache;

use super::InventoryJson;
use crate::state::AppState;

/// GET /instances - every instance of every cluster.
pub async fn list_instances(
    State(cache): State<Arc<InventoryCache>>,
) -> InventoryJson<InstanceListResponse> {
    let read = cache.list_instances().await;
    InventoryJson::from_read(read, InstanceListResponse::new)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(list_instances))
}
