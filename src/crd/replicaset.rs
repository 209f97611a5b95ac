use super::fleet::ClusterTemplateSpec;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// FleetReplicaSet keeps a fixed number of clusters of one template running
///
/// Created by the fleet reconciler, one per template revision. The template is
/// immutable; only the replica count and annotations change over its lifetime.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "orchestration.kulta.io",
    version = "v1alpha1",
    kind = "FleetReplicaSet",
    namespaced,
    status = "FleetReplicaSetStatus",
    shortname = "frs",
    printcolumn = r#"{"name":"Desired", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Current", "type":"integer", "jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct FleetReplicaSetSpec {
    /// Number of desired clusters
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Label selector for the clusters of this replica-set
    pub selector: LabelSelector,

    pub template: ClusterTemplateSpec,

    #[serde(rename = "minReadySeconds", skip_serializing_if = "Option::is_none")]
    pub min_ready_seconds: Option<i32>,
}

fn default_replicas() -> i32 {
    1
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct FleetReplicaSetStatus {
    /// Most recently observed number of clusters
    #[serde(default)]
    pub replicas: i32,

    #[serde(rename = "fullyLabeledReplicas", default)]
    pub fully_labeled_replicas: i32,

    #[serde(rename = "readyReplicas", default)]
    pub ready_replicas: i32,

    #[serde(rename = "availableReplicas", default)]
    pub available_replicas: i32,

    #[serde(rename = "observedGeneration", skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ReplicaSetCondition>,
}

/// Condition as reported by a replica-set (metav1.Condition shape)
///
/// Type and status are free-form strings here; the fleet promotes them into
/// its own typed conditions.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ReplicaSetCondition {
    #[serde(rename = "type")]
    pub type_: String,

    /// "True", "False" or "Unknown"
    pub status: String,

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
