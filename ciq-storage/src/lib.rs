//! ClusterIQ Storage - Snapshot Source and Inventory Cache
//!
//! Defines the snapshot source abstraction, its Redis implementation, and the
//! pull-per-query inventory cache built on top of it.

pub mod cache;
pub mod redis;

pub use cache::{
    CacheConfig, CacheHealth, InventoryCache, RefreshObserver, RefreshOutcome, RefreshPhase,
    RefreshPolicy, RefreshStatus, Snapshot, SnapshotRead, SnapshotSource,
};
pub use redis::{RedisConfig, RedisSnapshotClient, DEFAULT_SNAPSHOT_KEY};

use async_trait::async_trait;
use bytes::Bytes;
use ciq_core::{Inventory, RetrievalError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ============================================================================
// MOCK SNAPSHOT SOURCE (for testing)
// ============================================================================

/// Scriptable in-memory snapshot source for unit testing.
///
/// Serves whatever was last set: an inventory, raw bytes, or an error.
/// Starts out failing with [`RetrievalError::KeyNotFound`], like an empty
/// store.
#[derive(Debug)]
pub struct MockSnapshotSource {
    reply: Mutex<Result<Bytes, RetrievalError>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl Default for MockSnapshotSource {
    fn default() -> Self {
        Self {
            reply: Mutex::new(Err(RetrievalError::KeyNotFound {
                key: DEFAULT_SNAPSHOT_KEY.to_string(),
            })),
            delay: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }
}

impl MockSnapshotSource {
    /// Create a mock source with no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source serving `inventory`.
    pub fn with_inventory(inventory: &Inventory) -> Self {
        let source = Self::new();
        source.set_inventory(inventory);
        source
    }

    /// Serve `inventory` serialized as JSON.
    pub fn set_inventory(&self, inventory: &Inventory) {
        let reply = serde_json::to_vec(inventory)
            .map(Bytes::from)
            .map_err(|e| RetrievalError::Protocol {
                reason: e.to_string(),
            });
        *lock(&self.reply) = reply;
    }

    /// Serve raw bytes, decodable or not.
    pub fn set_bytes(&self, bytes: impl Into<Bytes>) {
        *lock(&self.reply) = Ok(bytes.into());
    }

    /// Fail every fetch with `error` until something else is set.
    pub fn set_error(&self, error: RetrievalError) {
        *lock(&self.reply) = Err(error);
    }

    /// Delay every fetch by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SnapshotSource for MockSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<Bytes, RetrievalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.reply).clone()
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciq_core::{Account, Provider};

    #[tokio::test]
    async fn test_mock_starts_empty() {
        let source = MockSnapshotSource::new();
        let result = source.fetch_snapshot().await;
        assert!(matches!(result, Err(RetrievalError::KeyNotFound { .. })));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_serves_inventory() -> Result<(), Box<dyn std::error::Error>> {
        let inventory = Inventory::new().with_account(Account::new("acct1", Provider::Aws));
        let source = MockSnapshotSource::with_inventory(&inventory);

        let bytes = source.fetch_snapshot().await?;
        assert_eq!(Inventory::from_json(&bytes)?, inventory);
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_switches_reply() {
        let source = MockSnapshotSource::new();
        source.set_bytes(&b"not json"[..]);
        assert!(source.fetch_snapshot().await.is_ok());

        source.set_error(RetrievalError::Server {
            message: "LOADING".to_string(),
        });
        assert!(source.fetch_snapshot().await.is_err());
        assert_eq!(source.fetch_count(), 2);
    }
}
