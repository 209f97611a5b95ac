//! Read access to fleets, replica-sets and pods
//!
//! The rollout helpers only ever list objects, so they depend on these
//! traits rather than on a `kube::Client`:
//! - `KubeLister` lists through the API server
//! - `MockLister` serves a fixed set of objects in tests

use super::error::FleetError;
use crate::crd::{Fleet, FleetReplicaSet};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::debug;

/// Lists replica-sets in a namespace matching a label selector string
#[async_trait]
pub trait ReplicaSetLister: Send + Sync {
    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<FleetReplicaSet>, FleetError>;
}

/// Lists pods in a namespace matching a label selector string
#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, FleetError>;
}

/// Lists every fleet in a namespace
#[async_trait]
pub trait FleetLister: Send + Sync {
    async fn list_fleets(&self, namespace: &str) -> Result<Vec<Fleet>, FleetError>;
}

/// Lister backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeLister {
    client: Client,
}

impl KubeLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplicaSetLister for KubeLister {
    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<FleetReplicaSet>, FleetError> {
        let rs_api: Api<FleetReplicaSet> = Api::namespaced(self.client.clone(), namespace);
        let list = rs_api.list(&ListParams::default().labels(selector)).await?;
        debug!(namespace = %namespace, selector = %selector, count = list.items.len(), "Listed fleet replica sets");
        Ok(list.items)
    }
}

#[async_trait]
impl PodLister for KubeLister {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, FleetError> {
        let pod_api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pod_api.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl FleetLister for KubeLister {
    async fn list_fleets(&self, namespace: &str) -> Result<Vec<Fleet>, FleetError> {
        let fleet_api: Api<Fleet> = Api::namespaced(self.client.clone(), namespace);
        let list = fleet_api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// In-memory lister for tests
///
/// Filters by namespace only and records the selector of the last call, so
/// tests can check both what was asked for and what the caller kept.
#[cfg(test)]
#[allow(clippy::expect_used)]
#[derive(Default)]
pub struct MockLister {
    pub fleets: Vec<Fleet>,
    pub replica_sets: Vec<FleetReplicaSet>,
    pub pods: Vec<Pod>,
    pub recorded_selector: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockLister {
    fn record(&self, selector: &str) {
        *self.recorded_selector.lock().expect("MockLister lock poisoned") = Some(selector.to_string());
    }

    pub fn last_selector(&self) -> Option<String> {
        self.recorded_selector
            .lock()
            .expect("MockLister lock poisoned")
            .clone()
    }
}

#[cfg(test)]
fn in_namespace<K: kube::Resource>(obj: &K, namespace: &str) -> bool {
    obj.meta().namespace.as_deref().unwrap_or_default() == namespace
}

#[cfg(test)]
#[async_trait]
impl ReplicaSetLister for MockLister {
    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &str,
    ) -> Result<Vec<FleetReplicaSet>, FleetError> {
        self.record(selector);
        Ok(self
            .replica_sets
            .iter()
            .filter(|rs| in_namespace(*rs, namespace))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[async_trait]
impl PodLister for MockLister {
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, FleetError> {
        self.record(selector);
        Ok(self
            .pods
            .iter()
            .filter(|pod| in_namespace(*pod, namespace))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[async_trait]
impl FleetLister for MockLister {
    async fn list_fleets(&self, namespace: &str) -> Result<Vec<Fleet>, FleetError> {
        Ok(self
            .fleets
            .iter()
            .filter(|fleet| in_namespace(*fleet, namespace))
            .cloned()
            .collect())
    }
}
