//! Cluster routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use ciq_core::ClusterListResponse;
use ciq_storage::InventoryCache;

use super::InventoryJson;
use crate::state::AppState;

/// GET /clusters - every cluster of every account.
pub async fn list_clusters(
    State(cache): State<Arc<InventoryCache>>,
) -> InventoryJson<ClusterListResponse> {
    let read = cache.list_clusters().await;
    InventoryJson::from_read(read, ClusterListResponse::new)
}

/// GET /clusters/:name - all clusters with exactly this name, in any account.
///
/// No match is an empty list, not a 404.
pub async fn get_clusters_by_name(
    State(cache): State<Arc<InventoryCache>>,
    Path(name): Path<String>,
) -> InventoryJson<ClusterListResponse> {
    let read = cache.find_clusters_by_name(&name).await;
    InventoryJson::from_read(read, ClusterListResponse::new)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clusters))
        .route("/:name", get(get_clusters_by_name))
}
