//! ClusterIQ Core - Inventory Types
//!
//! Pure data structures shared by the storage and API layers:
//! - The three-level inventory model (Account -> Cluster -> Instance)
//! - Flattening and lookup traversals over a loaded inventory
//! - List responses carrying an explicit item count
//! - The error taxonomy for snapshot retrieval and inventory queries
//!
//! This crate performs no I/O.

pub mod entities;
pub mod enums;
pub mod error;
pub mod inventory;
pub mod response;

pub use entities::{Account, Cluster, Instance, Tag};
pub use enums::{ClusterStatus, Provider};
pub use error::{ConfigError, InventoryError, InventoryResult, RetrievalError};
pub use inventory::Inventory;
pub use response::{AccountListResponse, ClusterListResponse, InstanceListResponse};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
