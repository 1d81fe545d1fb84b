//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use ciq_storage::InventoryCache;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The one inventory cache, built at startup.
    pub cache: Arc<InventoryCache>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(cache: Arc<InventoryCache>) -> Self {
        Self {
            cache,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<InventoryCache>, cache);
crate::impl_from_ref!(Instant, start_time);
