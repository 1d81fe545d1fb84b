//! Traits at the seams of the inventory cache.
//!
//! [`SnapshotSource`] abstracts the backing store so the cache can be driven
//! by the Redis client in production and by mocks in tests.
//! [`RefreshObserver`] lets an outer layer (metrics) see every refresh
//! attempt without the cache depending on it.

use async_trait::async_trait;
use bytes::Bytes;
use ciq_core::RetrievalError;

use super::inventory_cache::RefreshOutcome;

/// A store holding the serialized inventory under one well-known key.
///
/// # Implementation Requirements
///
/// - One call is one round trip; no retries, no caching between calls
/// - Every failure, including a missing key, is a [`RetrievalError`]
/// - Implementations must be `Send + Sync` so one source can serve all
///   request tasks
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the raw snapshot blob.
    async fn fetch_snapshot(&self) -> Result<Bytes, RetrievalError>;

    /// Human-readable location of the snapshot, for logs.
    fn describe(&self) -> String;
}

/// Receives the outcome of every refresh attempt the cache makes.
pub trait RefreshObserver: Send + Sync {
    fn on_refresh(&self, outcome: &RefreshOutcome);
}
