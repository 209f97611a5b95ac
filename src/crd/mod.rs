pub mod fleet;
pub mod replicaset;

pub use fleet::{
    ClusterSpec, ClusterTemplateSpec, ConditionStatus, Fleet, FleetCondition,
    FleetConditionType, FleetSpec, FleetStatus, HeadGroupSpec, WorkerGroupSpec,
};
pub use replicaset::{
    FleetReplicaSet, FleetReplicaSetSpec, FleetReplicaSetStatus, ReplicaSetCondition,
};
