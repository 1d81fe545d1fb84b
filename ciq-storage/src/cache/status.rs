//! Refresh history of the inventory cache.

use chrono::{DateTime, Utc};
use ciq_core::InventoryError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::freshness::CacheHealth;

/// Phase of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    /// Holding the last loaded snapshot (or nothing) with no fetch in flight.
    #[default]
    Stale,
    /// At least one fetch from the backing store is in flight.
    Refreshing,
}

/// Point-in-time view of the cache's refresh history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RefreshStatus {
    pub phase: RefreshPhase,
    /// Generation of the snapshot currently held (0 = never loaded).
    pub generation: u64,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Error of the most recent attempt, cleared by the next success.
    pub last_error: Option<String>,
    pub consecutive_failures: u64,
    pub total_attempts: u64,
    pub total_failures: u64,
}

impl RefreshStatus {
    pub(crate) fn record_success(&mut self, attempted_at: DateTime<Utc>, generation: u64) {
        self.generation = generation;
        self.last_attempt_at = Some(attempted_at);
        self.last_success_at = Some(Utc::now());
        self.last_error = None;
        self.consecutive_failures = 0;
        self.total_attempts += 1;
    }

    pub(crate) fn record_failure(&mut self, attempted_at: DateTime<Utc>, error: &InventoryError) {
        self.last_attempt_at = Some(attempted_at);
        self.last_error = Some(error.to_string());
        self.consecutive_failures += 1;
        self.total_attempts += 1;
        self.total_failures += 1;
    }

    /// True if a snapshot has ever been loaded.
    pub fn is_loaded(&self) -> bool {
        self.generation > 0
    }

    /// True if the most recent attempt succeeded. False before any attempt.
    pub fn last_attempt_succeeded(&self) -> bool {
        self.last_attempt_at.is_some() && self.last_error.is_none()
    }

    /// Time since the last successful load, `None` if nothing was ever loaded.
    pub fn staleness(&self) -> Option<Duration> {
        self.last_success_at.map(|at| {
            Utc::now()
                .signed_duration_since(at)
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Classify the cache against a staleness bound.
    pub fn health(&self, max_staleness: Duration) -> CacheHealth {
        match self.staleness() {
            None => CacheHealth::Empty,
            Some(age) if age > max_staleness => CacheHealth::Degraded,
            Some(_) if !self.last_attempt_succeeded() => CacheHealth::Degraded,
            Some(_) => CacheHealth::Healthy,
        }
    }
}
