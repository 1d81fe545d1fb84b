//! Core entity structures
//!
//! The stored snapshot is produced by an external scanner that may emit
//! `null` for empty collections, so every collection field goes through
//! [`null_as_default`].

use crate::{ClusterStatus, Provider};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Deserialize `null` (or a missing field, together with `#[serde(default)]`)
/// as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Key/value label attached to a cloud instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Instance - a single cloud machine belonging to a cluster.
///
/// The cache never interprets instances. Fields the model doesn't know are
/// kept in `extra` so they survive a load/serve round trip unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Instance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Cluster - a group of instances inside one account.
///
/// Names are unique within an account only; two accounts may both hold a
/// cluster called `"shared"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub name: String,
    /// Name of the owning account, as recorded by the scanner.
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub console_link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instances: Vec<Instance>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_name: account_name.into(),
            ..Default::default()
        }
    }

    /// Append an instance, keeping scanner order.
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

/// Account - a cloud account and the clusters discovered in it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: Provider,
    /// Clusters keyed by cluster name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: BTreeMap<String, Cluster>,
}

impl Account {
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Self {
            name: name.into(),
            provider,
            clusters: BTreeMap::new(),
        }
    }

    /// Add a cluster under its own name, replacing any cluster of the same name.
    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.clusters.insert(cluster.name.clone(), cluster);
        self
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_keeps_unknown_fields() -> Result<(), serde_json::Error> {
        let raw = json!({
            "id": "i-0abc",
            "name": "master-0",
            "provider": "AWS",
            "instanceType": "m5.xlarge",
            "availabilityZone": "eu-west-1a",
            "tags": [{"key": "Owner", "value": "team-a"}]
        });

        let instance: Instance = serde_json::from_value(raw)?;
        assert_eq!(instance.id, "i-0abc");
        assert_eq!(instance.instance_type, "m5.xlarge");
        assert_eq!(instance.provider, Provider::Aws);
        assert_eq!(instance.tags.len(), 1);
        assert_eq!(
            instance.extra.get("availabilityZone"),
            Some(&json!("eu-west-1a"))
        );

        let back = serde_json::to_value(&instance)?;
        assert_eq!(back["availabilityZone"], json!("eu-west-1a"));
        Ok(())
    }

    #[test]
    fn test_null_collections_become_empty() -> Result<(), serde_json::Error> {
        let cluster: Cluster =
            serde_json::from_value(json!({"name": "c1", "instances": null}))?;
        assert!(cluster.instances.is_empty());

        let account: Account =
            serde_json::from_value(json!({"name": "a1", "clusters": null}))?;
        assert!(account.clusters.is_empty());

        let instance: Instance = serde_json::from_value(json!({"id": "i-1", "tags": null}))?;
        assert!(instance.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_cluster_serializes_camel_case() -> Result<(), serde_json::Error> {
        let cluster = Cluster::new("clusterA", "acct1");
        let value = serde_json::to_value(&cluster)?;

        assert_eq!(value["accountName"], json!("acct1"));
        assert_eq!(value["consoleLink"], json!(""));
        assert_eq!(value["instances"], json!([]));
        Ok(())
    }

    #[test]
    fn test_account_with_cluster_keys_by_name() {
        let account = Account::new("acct1", Provider::Aws)
            .with_cluster(Cluster::new("a", "acct1"))
            .with_cluster(Cluster::new("b", "acct1"));

        assert_eq!(account.clusters.len(), 2);
        assert!(account.cluster("a").is_some());
        assert!(account.cluster("z").is_none());
    }
}
