//! Account routes.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use ciq_core::{Account, AccountListResponse};
use ciq_storage::InventoryCache;

use super::InventoryJson;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /accounts - every account in the inventory.
pub async fn list_accounts(
    State(cache): State<Arc<InventoryCache>>,
) -> InventoryJson<AccountListResponse> {
    let read = cache.list_accounts().await;
    InventoryJson::from_read(read, AccountListResponse::new)
}

/// GET /accounts/:name - one account, or 404.
pub async fn get_account(
    State(cache): State<Arc<InventoryCache>>,
    Path(name): Path<String>,
) -> ApiResult<InventoryJson<Account>> {
    let read = cache.find_account_by_name(&name).await?;
    Ok(InventoryJson::from_read(read, |account| account))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts))
        .route("/:name", get(get_account))
}
