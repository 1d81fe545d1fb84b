//! The inventory root and its traversals.
//!
//! An [`Inventory`] is one complete snapshot. Traversals borrow from it and
//! never allocate intermediate collections; callers collect into whatever
//! response shape they need.
//!
//! Accounts and clusters are keyed maps, so flattened sequences follow key
//! order. Instances keep the order the scanner recorded within a cluster.

use crate::entities::null_as_default;
use crate::{Account, Cluster, Instance, InventoryError, InventoryResult, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inventory - root of the Account -> Cluster -> Instance hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    /// Accounts keyed by account name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub accounts: BTreeMap<String, Account>,
    /// When the scanner produced this snapshot, if it recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<Timestamp>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a snapshot blob.
    pub fn from_json(bytes: &[u8]) -> InventoryResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| InventoryError::Deserialization {
            reason: e.to_string(),
        })
    }

    /// Encode this inventory in the snapshot wire format.
    pub fn to_json(&self) -> InventoryResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| InventoryError::Deserialization {
            reason: e.to_string(),
        })
    }

    /// Add an account under its own name, replacing any account of the same name.
    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.name.clone(), account);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    // ========================================================================
    // Traversals
    // ========================================================================

    /// Every account in the snapshot.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> + '_ {
        self.accounts.values()
    }

    /// Exact-match lookup by account key.
    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    /// Flatten Account -> Cluster.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> + '_ {
        self.accounts
            .values()
            .flat_map(|account| account.clusters.values())
    }

    /// Clusters whose name equals `name` exactly (case-sensitive), across all
    /// accounts.
    pub fn clusters_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Cluster> + 'a {
        self.clusters().filter(move |cluster| cluster.name == name)
    }

    /// Flatten Account -> Cluster -> Instance.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.clusters()
            .flat_map(|cluster| cluster.instances.iter())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn cluster_count(&self) -> usize {
        self.accounts.values().map(|a| a.clusters.len()).sum()
    }

    pub fn instance_count(&self) -> usize {
        self.clusters().map(Cluster::instance_count).sum()
    }
}
