use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fleet is a Custom Resource that keeps a family of versioned cluster replica-sets
///
/// Modelled after apps/v1 Deployment: every template change produces a new
/// FleetReplicaSet and the rollout shifts replicas from old to new.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "orchestration.kulta.io",
    version = "v1alpha1",
    kind = "Fleet",
    namespaced,
    status = "FleetStatus",
    shortname = "flt",
    printcolumn = r#"{"name":"Desired", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Current", "type":"integer", "jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Up-to-date", "type":"integer", "jsonPath":".status.updatedReplicas"}"#,
    printcolumn = r#"{"name":"Available", "type":"integer", "jsonPath":".status.availableReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct FleetSpec {
    /// Number of desired clusters
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Label selector for replica-sets and pods owned by this fleet
    pub selector: LabelSelector,

    /// Template every replica-set of this fleet stamps out
    pub template: ClusterTemplateSpec,

    /// Rollout strategy: "RollingUpdate" (default) or "Recreate"
    #[serde(default)]
    pub strategy: DeploymentStrategy,

    /// Minimum seconds a new cluster must be ready before it counts as available
    #[serde(rename = "minReadySeconds", skip_serializing_if = "Option::is_none")]
    pub min_ready_seconds: Option<i32>,

    /// Number of old replica-sets kept for rollback. Absent means unbounded.
    #[serde(
        rename = "revisionHistoryLimit",
        skip_serializing_if = "Option::is_none"
    )]
    pub revision_history_limit: Option<i32>,

    /// Paused fleets are not rolled out
    #[serde(default)]
    pub paused: bool,

    /// Maximum time in seconds for a rollout to make progress before it is considered failed.
    /// Absent means unbounded.
    #[serde(
        rename = "progressDeadlineSeconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress_deadline_seconds: Option<i32>,
}

fn default_replicas() -> i32 {
    1
}

/// Template of one cluster: a head group plus any number of worker groups
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterTemplateSpec {
    /// Labels and annotations stamped on every cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    pub spec: ClusterSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct ClusterSpec {
    /// Runtime version shared by head and workers
    #[serde(rename = "runtimeVersion", skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    #[serde(rename = "headGroupSpec")]
    pub head_group_spec: HeadGroupSpec,

    #[serde(rename = "workerGroupSpecs", default, skip_serializing_if = "Vec::is_empty")]
    pub worker_group_specs: Vec<WorkerGroupSpec>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct HeadGroupSpec {
    /// Service type exposing the head node (ClusterIP, NodePort, LoadBalancer)
    #[serde(rename = "serviceType", skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Start parameters passed to the head process
    #[serde(rename = "startParams", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub start_params: BTreeMap<String, String>,

    pub template: PodTemplateSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct WorkerGroupSpec {
    #[serde(rename = "groupName")]
    pub group_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(rename = "minReplicas", skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(rename = "maxReplicas", skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    /// Start parameters passed to every worker process
    #[serde(rename = "startParams", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub start_params: BTreeMap<String, String>,

    pub template: PodTemplateSpec,
}

/// Observed state of a Fleet
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct FleetStatus {
    /// Most recent generation observed by the controller
    #[serde(rename = "observedGeneration", skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Total number of non-terminated clusters targeted by this fleet
    #[serde(default)]
    pub replicas: i32,

    /// Clusters running the current template
    #[serde(rename = "updatedReplicas", default)]
    pub updated_replicas: i32,

    #[serde(rename = "readyReplicas", default)]
    pub ready_replicas: i32,

    #[serde(rename = "availableReplicas", default)]
    pub available_replicas: i32,

    #[serde(rename = "unavailableReplicas", default)]
    pub unavailable_replicas: i32,

    /// Latest observations of the fleet's state, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<FleetCondition>,

    /// Bumped whenever the template hash of a new replica-set collides with an existing one
    #[serde(rename = "collisionCount", skip_serializing_if = "Option::is_none")]
    pub collision_count: Option<i32>,
}

/// A typed status condition of a Fleet
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct FleetCondition {
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub type_: FleetConditionType,

    pub status: ConditionStatus,

    /// Last time this condition was written
    #[serde(rename = "lastUpdateTime", skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,

    /// Last time the status flipped
    #[serde(
        rename = "lastTransitionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub message: String,
}

/// Condition types of a Fleet
///
/// Serialized as a plain string so conditions promoted from child resources
/// keep whatever type they carried.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum FleetConditionType {
    /// Minimum availability reached
    Available,
    /// Rollout is making progress (or has timed out)
    Progressing,
    /// A replica-set failed to create or delete clusters
    ReplicaFailure,
    Other(String),
}

impl From<String> for FleetConditionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Available" => FleetConditionType::Available,
            "Progressing" => FleetConditionType::Progressing,
            "ReplicaFailure" => FleetConditionType::ReplicaFailure,
            _ => FleetConditionType::Other(value),
        }
    }
}

impl From<FleetConditionType> for String {
    fn from(value: FleetConditionType) -> Self {
        match value {
            FleetConditionType::Available => "Available".to_string(),
            FleetConditionType::Progressing => "Progressing".to_string(),
            FleetConditionType::ReplicaFailure => "ReplicaFailure".to_string(),
            FleetConditionType::Other(other) => other,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<&str> for ConditionStatus {
    fn from(value: &str) -> Self {
        match value {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

#[cfg(test)]
#[path = "fleet_test.rs"]
mod tests;
