//! ClusterIQ Test Utilities
//!
//! Shared test infrastructure for the ClusterIQ workspace:
//! - Proptest generators for inventory entities
//! - The scripted snapshot source
//! - Fixtures for common inventory shapes
//! - Custom assertions for cache reads

// Re-export the mock source from its source crate
pub use ciq_storage::MockSnapshotSource;

// Re-export core types for convenience
pub use ciq_core::{
    Account, Cluster, ClusterStatus, Instance, Inventory, InventoryError, InventoryResult,
    Provider, RetrievalError, Tag, Timestamp,
};
pub use ciq_storage::{CacheConfig, InventoryCache, RefreshPolicy, SnapshotRead};

use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating inventory entities.
    //!
    //! Generated inventories are internally consistent: map keys equal the
    //! entity names and every cluster records its owning account.

    use super::*;
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// Short lowercase identifier, also used for map keys.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,8}"
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-01-01 .. 2030-01-01, whole seconds
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default()
        })
    }

    pub fn arb_provider() -> impl Strategy<Value = Provider> {
        prop_oneof![
            Just(Provider::Aws),
            Just(Provider::Gcp),
            Just(Provider::Azure),
            Just(Provider::Unknown),
            "[A-Za-z][A-Za-z0-9 _-]{0,10}".prop_map(Provider::from),
        ]
    }

    pub fn arb_cluster_status() -> impl Strategy<Value = ClusterStatus> {
        prop_oneof![
            Just(ClusterStatus::Running),
            Just(ClusterStatus::Stopped),
            Just(ClusterStatus::Terminated),
            Just(ClusterStatus::Unknown),
            "[A-Za-z][A-Za-z0-9 _-]{0,10}".prop_map(ClusterStatus::from),
        ]
    }

    pub fn arb_tag() -> impl Strategy<Value = Tag> {
        (arb_name(), "[A-Za-z0-9 ]{0,12}").prop_map(|(key, value)| Tag { key, value })
    }

    /// Scanner fields the model doesn't know about. Keys carry an `x_`
    /// prefix so they never shadow a modelled field.
    pub fn arb_extra_fields() -> impl Strategy<Value = Map<String, Value>> {
        let value = prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,10}".prop_map(Value::from),
        ];
        prop::collection::btree_map("x_[a-z]{1,6}", value, 0..3)
            .prop_map(|fields| fields.into_iter().collect())
    }

    /// Generate an instance belonging to `cluster_name`.
    pub fn arb_instance(cluster_name: String) -> impl Strategy<Value = Instance> {
        (
            "i-[0-9a-f]{8}",
            arb_name(),
            arb_provider(),
            prop_oneof![Just("t3.micro"), Just("m5.xlarge"), Just("n2-standard-4")],
            prop_oneof![Just("us-east-1"), Just("eu-west-1"), Just("europe-west4")],
            prop_oneof![Just("running"), Just("stopped"), Just("pending")],
            prop::collection::vec(arb_tag(), 0..3),
            arb_extra_fields(),
        )
            .prop_map(
                move |(id, name, provider, instance_type, region, state, tags, extra)| Instance {
                    id,
                    name,
                    provider,
                    instance_type: instance_type.to_string(),
                    region: region.to_string(),
                    state: state.to_string(),
                    cluster_name: cluster_name.clone(),
                    tags,
                    extra,
                },
            )
    }

    /// Generate a cluster with the given name inside `account_name`.
    pub fn arb_cluster(name: String, account_name: String) -> impl Strategy<Value = Cluster> {
        (
            arb_provider(),
            arb_cluster_status(),
            prop_oneof![Just("us-east-1"), Just("eu-west-1")],
            prop::collection::vec(arb_instance(name.clone()), 0..4),
        )
            .prop_map(move |(provider, status, region, instances)| Cluster {
                name: name.clone(),
                account_name: account_name.clone(),
                provider,
                status,
                region: region.to_string(),
                console_link: format!("https://console.example.com/{}/{}", account_name, name),
                instances,
            })
    }

    /// Generate an account with the given name and up to three clusters.
    pub fn arb_account(name: String) -> impl Strategy<Value = Account> {
        (
            arb_provider(),
            prop::collection::btree_set(arb_name(), 0..4),
        )
            .prop_flat_map(move |(provider, cluster_names)| {
                let account_name = name.clone();
                let clusters: Vec<_> = cluster_names
                    .into_iter()
                    .map(|cluster_name| arb_cluster(cluster_name, account_name.clone()))
                    .collect();
                clusters.prop_map(move |clusters| {
                    clusters.into_iter().fold(
                        Account::new(account_name.clone(), provider.clone()),
                        Account::with_cluster,
                    )
                })
            })
    }

    /// Generate a complete inventory of up to four accounts.
    pub fn arb_inventory() -> impl Strategy<Value = Inventory> {
        (
            prop::collection::btree_set(arb_name(), 0..5),
            prop::option::of(arb_timestamp()),
        )
            .prop_flat_map(|(account_names, creation_timestamp)| {
                let accounts: Vec<_> = account_names.into_iter().map(arb_account).collect();
                accounts.prop_map(move |accounts| {
                    let mut inventory = accounts
                        .into_iter()
                        .fold(Inventory::new(), Inventory::with_account);
                    inventory.creation_timestamp = creation_timestamp;
                    inventory
                })
            })
    }

    /// Generate an inventory holding at least one account.
    pub fn arb_populated_inventory() -> impl Strategy<Value = Inventory> {
        arb_inventory().prop_filter("needs an account", |inventory| !inventory.is_empty())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Inventories and caches for common scenarios.

    use super::*;

    /// One AWS account `acct1` holding cluster `clusterA` with two instances.
    pub fn single_account_inventory() -> Inventory {
        let mut cluster = Cluster::new("clusterA", "acct1");
        cluster.provider = Provider::Aws;
        cluster.status = ClusterStatus::Running;
        cluster.region = "us-east-1".to_string();

        let cluster = cluster
            .with_instance(instance("i-1", "clusterA"))
            .with_instance(instance("i-2", "clusterA"));

        Inventory::new().with_account(Account::new("acct1", Provider::Aws).with_cluster(cluster))
    }

    /// Two accounts that each hold a cluster named `shared`.
    pub fn shared_cluster_name_inventory() -> Inventory {
        Inventory::new()
            .with_account(
                Account::new("acct1", Provider::Aws)
                    .with_cluster(
                        Cluster::new("shared", "acct1")
                            .with_instance(instance("i-10", "shared"))
                            .with_instance(instance("i-11", "shared")),
                    )
                    .with_cluster(Cluster::new("solo", "acct1")),
            )
            .with_account(
                Account::new("acct2", Provider::Gcp).with_cluster(
                    Cluster::new("shared", "acct2").with_instance(instance("i-20", "shared")),
                ),
            )
    }

    pub fn empty_inventory() -> Inventory {
        Inventory::new()
    }

    /// A snapshot whose collections the scanner wrote as `null`.
    pub fn null_collections_json() -> &'static [u8] {
        br#"{
            "accounts": {
                "acct1": {
                    "name": "acct1",
                    "provider": "AWS",
                    "clusters": {
                        "empty": {"name": "empty", "accountName": "acct1", "instances": null}
                    }
                },
                "acct2": {"name": "acct2", "provider": "GCP", "clusters": null}
            }
        }"#
    }

    /// A snapshot with one instance carrying fields the model doesn't know.
    pub fn unknown_instance_fields_json() -> &'static [u8] {
        br#"{
            "accounts": {
                "acct1": {
                    "name": "acct1",
                    "provider": "AWS",
                    "clusters": {
                        "clusterA": {
                            "name": "clusterA",
                            "accountName": "acct1",
                            "instances": [{
                                "id": "i-1",
                                "name": "worker",
                                "provider": "AWS",
                                "availabilityZone": "us-east-1a",
                                "costs": {"daily": 1.25}
                            }]
                        }
                    }
                }
            }
        }"#
    }

    /// A running instance with the given id.
    pub fn instance(id: &str, cluster_name: &str) -> Instance {
        let mut instance = Instance::new(id, format!("{}-{}", cluster_name, id));
        instance.provider = Provider::Aws;
        instance.state = "running".to_string();
        instance.cluster_name = cluster_name.to_string();
        instance
    }

    /// A mock source serving `inventory` and a cache in front of it.
    pub fn mock_cache(
        inventory: &Inventory,
        config: CacheConfig,
    ) -> (Arc<MockSnapshotSource>, InventoryCache) {
        let source = Arc::new(MockSnapshotSource::with_inventory(inventory));
        let cache = InventoryCache::new(source.clone(), config);
        (source, cache)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for cache reads.

    use super::*;

    /// Assert the read came from a successful refresh of `generation`.
    #[track_caller]
    pub fn assert_fresh<T>(read: &SnapshotRead<T>, generation: u64) {
        assert!(read.is_fresh(), "Expected a fresh read, got a stale one");
        assert_eq!(read.generation(), generation, "Unexpected snapshot generation");
    }

    /// Assert the read served the last known good snapshot `generation`.
    #[track_caller]
    pub fn assert_stale<T>(read: &SnapshotRead<T>, generation: u64) {
        assert!(read.is_stale(), "Expected a stale read, got a fresh one");
        assert_eq!(read.generation(), generation, "Unexpected snapshot generation");
    }

    #[track_caller]
    pub fn assert_account_not_found<T: std::fmt::Debug>(result: &InventoryResult<T>, name: &str) {
        match result {
            Err(InventoryError::AccountNotFound { name: missing }) => {
                assert_eq!(missing, name, "NotFound for the wrong account");
            }
            other => panic!("Expected AccountNotFound for '{}', got {:?}", name, other),
        }
    }

    /// Assert the instances carry exactly `ids`, in order.
    #[track_caller]
    pub fn assert_instance_ids(instances: &[Instance], ids: &[&str]) {
        let actual: Vec<&str> = instances.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(actual, ids);
    }
}
