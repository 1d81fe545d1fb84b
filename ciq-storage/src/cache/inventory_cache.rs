//! Pull-per-query inventory cache.
//!
//! Every query first refreshes the held snapshot from the backing store and
//! then traverses whatever snapshot is held afterwards. A failed refresh
//! keeps the last known good snapshot and the query is answered from it.
//!
//! # Concurrency
//!
//! The held snapshot is an `Arc<Snapshot>` behind an async `RwLock`. A
//! refresh decodes the new inventory without any lock held and swaps the
//! `Arc` under the write lock; queries clone the `Arc` under the read lock
//! and traverse it unlocked. Readers therefore always see one complete
//! snapshot.
//!
//! How concurrent refreshes interact is chosen by [`RefreshPolicy`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use ciq_core::{
    Account, Cluster, ConfigError, Instance, Inventory, InventoryError, InventoryResult,
    RetrievalError,
};
use tokio::sync::{Mutex, RwLock};

use super::freshness::{CacheHealth, SnapshotRead};
use super::status::{RefreshPhase, RefreshStatus};
use super::traits::{RefreshObserver, SnapshotSource};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// How concurrent queries share refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefreshPolicy {
    /// Refreshes run one at a time. A query that finds a refresh started
    /// after its own arrival already completed reuses it instead of fetching
    /// again, so answers never go back in time.
    #[default]
    Coalesced,
    /// Every query fetches on its own, concurrently with the others. A slow
    /// fetch may replace a snapshot loaded by a faster, later one.
    Independent,
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::Coalesced => f.write_str("coalesced"),
            RefreshPolicy::Independent => f.write_str("independent"),
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coalesced" => Ok(RefreshPolicy::Coalesced),
            "independent" => Ok(RefreshPolicy::Independent),
            _ => Err(ConfigError::InvalidValue {
                field: "refresh_policy".to_string(),
                value: s.to_string(),
                reason: "expected 'coalesced' or 'independent'".to_string(),
            }),
        }
    }
}

/// Configuration for the inventory cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Deadline for one fetch from the backing store.
    pub fetch_timeout: Duration,
    /// How concurrent refreshes are combined.
    pub refresh_policy: RefreshPolicy,
    /// Age after which a loaded snapshot is reported as degraded.
    pub max_staleness: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(5),
            refresh_policy: RefreshPolicy::Coalesced,
            max_staleness: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fetch deadline.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the refresh policy.
    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    /// Set the staleness bound used for health reporting.
    pub fn with_max_staleness(mut self, duration: Duration) -> Self {
        self.max_staleness = duration;
        self
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// One complete inventory as produced by a single successful load.
#[derive(Debug, Default)]
pub struct Snapshot {
    inventory: Inventory,
    generation: u64,
    loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The snapshot held before anything was loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn loaded(inventory: Inventory, generation: u64, loaded_at: DateTime<Utc>) -> Self {
        Self {
            inventory,
            generation,
            loaded_at: Some(loaded_at),
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }
}

/// What a call to [`InventoryCache::refresh`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A new snapshot was fetched, decoded and swapped in.
    Loaded { generation: u64, elapsed: Duration },
    /// A refresh that started after this call arrived had already finished;
    /// its result was reused.
    Coalesced { generation: u64, succeeded: bool },
    /// The fetch or decode failed; the held snapshot is unchanged.
    Failed {
        error: InventoryError,
        elapsed: Duration,
    },
}

impl RefreshOutcome {
    /// True when the snapshot held afterwards reflects a successful load made
    /// for this call.
    pub fn succeeded(&self) -> bool {
        match self {
            RefreshOutcome::Loaded { .. } => true,
            RefreshOutcome::Coalesced { succeeded, .. } => *succeeded,
            RefreshOutcome::Failed { .. } => false,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Loaded { .. } => "loaded",
            RefreshOutcome::Coalesced { .. } => "coalesced",
            RefreshOutcome::Failed { .. } => "failed",
        }
    }

    /// Time spent fetching and decoding, `None` for coalesced calls.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            RefreshOutcome::Loaded { elapsed, .. } | RefreshOutcome::Failed { elapsed, .. } => {
                Some(*elapsed)
            }
            RefreshOutcome::Coalesced { .. } => None,
        }
    }
}

// ============================================================================
// INVENTORY CACHE
// ============================================================================

struct CacheState {
    snapshot: Arc<Snapshot>,
    status: RefreshStatus,
    /// Highest start ticket among refreshes that ran to completion.
    /// Cancelled refreshes never record theirs.
    completed_ticket: u64,
}

/// Decrements the in-flight counter even if the refreshing task is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// In-memory inventory refreshed from a [`SnapshotSource`] on every query.
///
/// Construct once at startup and share through an `Arc`; there is no
/// background task and nothing to shut down.
///
/// # Example
///
/// ```ignore
/// let cache = InventoryCache::new(Arc::new(redis_client), CacheConfig::default());
///
/// let clusters = cache.find_clusters_by_name("prod").await;
/// if clusters.is_stale() {
///     tracing::warn!(generation = clusters.generation(), "Serving stale clusters");
/// }
/// let clusters = clusters.into_value();
/// ```
pub struct InventoryCache {
    source: Arc<dyn SnapshotSource>,
    config: CacheConfig,
    state: RwLock<CacheState>,
    /// Serializes refreshes under [`RefreshPolicy::Coalesced`].
    refresh_gate: Mutex<()>,
    /// Start tickets handed out so far; each refresh attempt takes the next.
    started: AtomicU64,
    in_flight: AtomicUsize,
    observer: Option<Arc<dyn RefreshObserver>>,
}

impl InventoryCache {
    /// Create a cache holding no snapshot.
    pub fn new(source: Arc<dyn SnapshotSource>, config: CacheConfig) -> Self {
        Self {
            source,
            config,
            state: RwLock::new(CacheState {
                snapshot: Arc::new(Snapshot::empty()),
                status: RefreshStatus::default(),
                completed_ticket: 0,
            }),
            refresh_gate: Mutex::new(()),
            started: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            observer: None,
        }
    }

    /// Create a cache with default configuration.
    pub fn with_defaults(source: Arc<dyn SnapshotSource>) -> Self {
        Self::new(source, CacheConfig::default())
    }

    /// Report every refresh outcome to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RefreshObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The snapshot currently held, without refreshing.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state.read().await.snapshot)
    }

    /// Refresh history, with the phase taken at the time of the call.
    pub async fn status(&self) -> RefreshStatus {
        let mut status = self.state.read().await.status.clone();
        status.phase = if self.in_flight.load(Ordering::Acquire) > 0 {
            RefreshPhase::Refreshing
        } else {
            RefreshPhase::Stale
        };
        status
    }

    /// Health against the configured staleness bound.
    pub async fn health(&self) -> CacheHealth {
        self.state
            .read()
            .await
            .status
            .health(self.config.max_staleness)
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Try to replace the held snapshot with the one in the backing store.
    ///
    /// Never fails: errors are logged, recorded in [`RefreshStatus`] and
    /// returned as [`RefreshOutcome::Failed`] while the old snapshot stays.
    pub async fn refresh(&self) -> RefreshOutcome {
        let outcome = match self.config.refresh_policy {
            RefreshPolicy::Independent => self.refresh_now().await,
            RefreshPolicy::Coalesced => {
                let ticket = self.started.load(Ordering::Acquire);
                let _gate = self.refresh_gate.lock().await;

                let state = self.state.read().await;
                if state.completed_ticket > ticket {
                    RefreshOutcome::Coalesced {
                        generation: state.snapshot.generation(),
                        succeeded: state.status.last_attempt_succeeded(),
                    }
                } else {
                    drop(state);
                    self.refresh_now().await
                }
            }
        };

        if let Some(observer) = &self.observer {
            observer.on_refresh(&outcome);
        }
        outcome
    }

    async fn refresh_now(&self) -> RefreshOutcome {
        let ticket = self.started.fetch_add(1, Ordering::AcqRel) + 1;
        let attempted_at = Utc::now();
        let start = Instant::now();

        let result = {
            let _in_flight = InFlightGuard::enter(&self.in_flight);
            self.load().await
        };
        let elapsed = start.elapsed();

        let mut state = self.state.write().await;
        state.completed_ticket = state.completed_ticket.max(ticket);
        match result {
            Ok(inventory) => {
                let generation = state.status.generation + 1;
                tracing::debug!(
                    generation,
                    accounts = inventory.account_count(),
                    clusters = inventory.cluster_count(),
                    instances = inventory.instance_count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Inventory snapshot loaded"
                );
                state.snapshot = Arc::new(Snapshot::loaded(inventory, generation, Utc::now()));
                state.status.record_success(attempted_at, generation);
                RefreshOutcome::Loaded {
                    generation,
                    elapsed,
                }
            }
            Err(error) => {
                state.status.record_failure(attempted_at, &error);
                tracing::error!(
                    error = %error,
                    source = %self.source.describe(),
                    generation = state.status.generation,
                    consecutive_failures = state.status.consecutive_failures,
                    "Can't refresh inventory snapshot, serving last known good"
                );
                RefreshOutcome::Failed { error, elapsed }
            }
        }
    }

    async fn load(&self) -> InventoryResult<Inventory> {
        let fetch = self.source.fetch_snapshot();
        let bytes = match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RetrievalError::Timeout {
                    after: self.config.fetch_timeout,
                }
                .into())
            }
        };
        Inventory::from_json(&bytes)
    }

    /// Refresh, then run `traverse` over whichever snapshot is held.
    async fn query<T>(&self, traverse: impl FnOnce(&Inventory) -> T) -> SnapshotRead<T> {
        let outcome = self.refresh().await;
        let snapshot = self.snapshot().await;
        SnapshotRead::new(traverse(snapshot.inventory()), &snapshot, outcome.succeeded())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every instance of every cluster of every account.
    pub async fn list_instances(&self) -> SnapshotRead<Vec<Instance>> {
        tracing::debug!("Retrieving complete instance inventory");
        self.query(|inventory| inventory.instances().cloned().collect())
            .await
    }

    /// Every cluster of every account.
    pub async fn list_clusters(&self) -> SnapshotRead<Vec<Cluster>> {
        tracing::debug!("Retrieving complete cluster inventory");
        self.query(|inventory| inventory.clusters().cloned().collect())
            .await
    }

    /// All clusters named exactly `name`, in any account.
    pub async fn find_clusters_by_name(&self, name: &str) -> SnapshotRead<Vec<Cluster>> {
        tracing::debug!(cluster_name = name, "Retrieving clusters by name");
        self.query(|inventory| inventory.clusters_named(name).cloned().collect())
            .await
    }

    /// Every account.
    pub async fn list_accounts(&self) -> SnapshotRead<Vec<Account>> {
        tracing::debug!("Retrieving complete accounts inventory");
        self.query(|inventory| inventory.accounts().cloned().collect())
            .await
    }

    /// The account keyed `name`.
    ///
    /// # Errors
    ///
    /// [`InventoryError::AccountNotFound`] when the held snapshot has no such
    /// account. Refresh failures are never returned here.
    pub async fn find_account_by_name(&self, name: &str) -> InventoryResult<SnapshotRead<Account>> {
        tracing::debug!(account_name = name, "Retrieving account by name");
        self.query(|inventory| inventory.account(name).cloned())
            .await
            .transpose()
            .ok_or_else(|| {
                tracing::debug!(account_name = name, "Account not found in snapshot");
                InventoryError::AccountNotFound {
                    name: name.to_string(),
                }
            })
    }
}

impl fmt::Debug for InventoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryCache")
            .field("source", &self.source.describe())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
