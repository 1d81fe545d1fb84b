//! Error types for ClusterIQ operations

use std::time::Duration;
use thiserror::Error;

/// Snapshot store retrieval errors.
///
/// Every way a fetch can fail is a retrieval failure; "key missing" and
/// "store unreachable" are variants of the same error, not different kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("Can't connect to snapshot store at {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("Snapshot store authentication failed: {reason}")]
    Auth { reason: String },

    #[error("Snapshot fetch timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Snapshot store replied with an error: {message}")]
    Server { message: String },

    #[error("Snapshot key '{key}' not found")]
    KeyNotFound { key: String },

    #[error("Snapshot store protocol error: {reason}")]
    Protocol { reason: String },

    #[error("Snapshot store I/O error: {reason}")]
    Io { reason: String },
}

impl From<std::io::Error> for RetrievalError {
    fn from(err: std::io::Error) -> Self {
        RetrievalError::Io {
            reason: err.to_string(),
        }
    }
}

/// Inventory cache and query errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Snapshot retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Snapshot deserialization failed: {reason}")]
    Deserialization { reason: String },

    #[error("No such account: {name}")]
    AccountNotFound { name: String },
}

impl InventoryError {
    /// True for failures of a refresh attempt (retrieval or deserialization).
    pub fn is_refresh_failure(&self) -> bool {
        matches!(
            self,
            InventoryError::Retrieval(_) | InventoryError::Deserialization { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, InventoryError::AccountNotFound { .. })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
