//! List responses for the query surface.
//!
//! Each response carries an explicit `count` next to its items. The items
//! field always serializes as an array, `[]` when nothing matched.

use crate::{Account, Cluster, Instance};
use serde::{Deserialize, Serialize};

/// List of instances with their count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceListResponse {
    pub count: usize,
    pub instances: Vec<Instance>,
}

impl InstanceListResponse {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self {
            count: instances.len(),
            instances,
        }
    }
}

impl From<Vec<Instance>> for InstanceListResponse {
    fn from(instances: Vec<Instance>) -> Self {
        Self::new(instances)
    }
}

/// List of clusters with their count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusterListResponse {
    pub count: usize,
    pub clusters: Vec<Cluster>,
}

impl ClusterListResponse {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        Self {
            count: clusters.len(),
            clusters,
        }
    }
}

impl From<Vec<Cluster>> for ClusterListResponse {
    fn from(clusters: Vec<Cluster>) -> Self {
        Self::new(clusters)
    }
}

/// List of accounts with their count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountListResponse {
    pub count: usize,
    pub accounts: Vec<Account>,
}

impl AccountListResponse {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            count: accounts.len(),
            accounts,
        }
    }
}

impl From<Vec<Account>> for AccountListResponse {
    fn from(accounts: Vec<Account>) -> Self {
        Self::new(accounts)
    }
}
