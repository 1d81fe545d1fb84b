//! Freshness metadata for inventory reads.
//!
//! Every query answer says which snapshot it came from and whether the
//! refresh attempted for it succeeded. A query never fails because the
//! backing store is down; instead the caller can see that the answer is
//! stale and by how much.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::inventory_cache::Snapshot;

/// Result of a cache query, carrying snapshot metadata.
#[derive(Debug, Clone)]
pub struct SnapshotRead<T> {
    /// The query result.
    value: T,
    /// Generation of the snapshot the value was computed from (0 = never loaded).
    generation: u64,
    /// When that snapshot was loaded.
    loaded_at: Option<DateTime<Utc>>,
    /// Whether the refresh made for this query succeeded.
    fresh: bool,
}

impl<T> SnapshotRead<T> {
    pub(crate) fn new(value: T, snapshot: &Snapshot, fresh: bool) -> Self {
        Self {
            value,
            generation: snapshot.generation(),
            loaded_at: snapshot.loaded_at(),
            fresh,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Generation of the snapshot served. Increases by one per successful load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the served snapshot was loaded, `None` if nothing was ever loaded.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// True when this answer reflects a refresh that succeeded for this query.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// True when the refresh failed and the last known good snapshot was served.
    pub fn is_stale(&self) -> bool {
        !self.fresh
    }

    /// Age of the served snapshot, `None` if nothing was ever loaded.
    pub fn staleness(&self) -> Option<Duration> {
        self.loaded_at.map(|loaded_at| {
            Utc::now()
                .signed_duration_since(loaded_at)
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> SnapshotRead<U>
    where
        F: FnOnce(T) -> U,
    {
        SnapshotRead {
            value: f(self.value),
            generation: self.generation,
            loaded_at: self.loaded_at,
            fresh: self.fresh,
        }
    }
}

impl<T> SnapshotRead<Option<T>> {
    /// Turn a read of an optional value into an optional read.
    pub fn transpose(self) -> Option<SnapshotRead<T>> {
        let SnapshotRead {
            value,
            generation,
            loaded_at,
            fresh,
        } = self;
        value.map(|value| SnapshotRead {
            value,
            generation,
            loaded_at,
            fresh,
        })
    }
}

impl<T> AsRef<T> for SnapshotRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Coarse health of the cache, derived from its refresh history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheHealth {
    /// A snapshot is loaded, the last refresh succeeded and it is within the staleness bound.
    Healthy,
    /// A snapshot is loaded but the last refresh failed or it is older than the bound.
    Degraded,
    /// No snapshot was ever loaded; every query answers with empty collections.
    Empty,
}

impl CacheHealth {
    pub fn is_serving_data(&self) -> bool {
        !matches!(self, CacheHealth::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciq_core::Inventory;

    #[test]
    fn test_read_from_empty_snapshot() {
        let snapshot = Snapshot::empty();
        let read = SnapshotRead::new(vec![1, 2], &snapshot, false);

        assert_eq!(read.generation(), 0);
        assert!(read.loaded_at().is_none());
        assert!(read.staleness().is_none());
        assert!(read.is_stale());
        assert_eq!(read.into_value(), vec![1, 2]);
    }

    #[test]
    fn test_read_staleness() {
        let loaded_at = Utc::now() - chrono::Duration::seconds(5);
        let snapshot = Snapshot::loaded(Inventory::new(), 3, loaded_at);
        let read = SnapshotRead::new("value", &snapshot, true);

        assert!(read.is_fresh());
        assert_eq!(read.generation(), 3);
        let staleness = read.staleness().unwrap_or_default();
        assert!(staleness >= Duration::from_secs(4));
        assert!(staleness <= Duration::from_secs(10));
    }

    #[test]
    fn test_read_map_and_transpose() {
        let snapshot = Snapshot::loaded(Inventory::new(), 1, Utc::now());

        let read = SnapshotRead::new(Some(42), &snapshot, true);
        let inner = read.transpose().map(|r| r.map(|v| v.to_string()));
        assert_eq!(inner.map(SnapshotRead::into_value), Some("42".to_string()));

        let read: SnapshotRead<Option<i32>> = SnapshotRead::new(None, &snapshot, true);
        assert!(read.transpose().is_none());
    }

    #[test]
    fn test_cache_health_serialization() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&CacheHealth::Degraded)?, "\"degraded\"");
        assert!(CacheHealth::Healthy.is_serving_data());
        assert!(!CacheHealth::Empty.is_serving_data());
        Ok(())
    }
}
