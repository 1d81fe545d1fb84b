//! Inventory cache with explicit staleness.
//!
//! The cache holds one complete [`Inventory`](ciq_core::Inventory) snapshot
//! and refreshes it from a [`SnapshotSource`] before answering each query.
//! Refresh failures never surface to callers: the last loaded snapshot is
//! served instead, and every answer is a [`SnapshotRead<T>`] saying which
//! snapshot it came from and whether its refresh succeeded.
//!
//! # Example
//!
//! ```ignore
//! let cache = InventoryCache::new(source, CacheConfig::default());
//!
//! let accounts = cache.list_accounts().await;
//! if accounts.is_stale() {
//!     tracing::warn!(staleness = ?accounts.staleness(), "Backing store unavailable");
//! }
//!
//! match cache.find_account_by_name("acct1").await {
//!     Ok(account) => println!("{}", account.value().name),
//!     Err(e) if e.is_not_found() => println!("no such account"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod freshness;
pub mod inventory_cache;
pub mod status;
pub mod traits;

pub use freshness::{CacheHealth, SnapshotRead};
pub use inventory_cache::{CacheConfig, InventoryCache, RefreshOutcome, RefreshPolicy, Snapshot};
pub use status::{RefreshPhase, RefreshStatus};
pub use traits::{RefreshObserver, SnapshotSource};
