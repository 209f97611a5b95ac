use crate::crd::{
    ConditionStatus, FleetCondition, FleetConditionType, FleetStatus, ReplicaSetCondition,
};
use chrono::{DateTime, Utc};

// Progressing reasons

/// One of the fleet's replica-sets was updated as part of the rollout
pub const REPLICA_SET_UPDATED_REASON: &str = "ReplicaSetUpdated";
/// The fleet could not create its new replica-set
pub const FAILED_RS_CREATE_REASON: &str = "ReplicaSetCreateError";
/// The fleet created its new replica-set
pub const NEW_REPLICA_SET_REASON: &str = "NewReplicaSetCreated";
/// The fleet adopted an existing replica-set as its new one
pub const FOUND_NEW_RS_REASON: &str = "FoundNewReplicaSet";
/// The new replica-set reached minimum availability; the rollout succeeded
pub const NEW_RS_AVAILABLE_REASON: &str = "NewReplicaSetAvailable";
/// The new replica-set made no progress within progressDeadlineSeconds
pub const TIMED_OUT_REASON: &str = "ProgressDeadlineExceeded";
/// Lack of progress is not estimated while paused
pub const PAUSED_FLEET_REASON: &str = "DeploymentPaused";
/// Resumed fleets restart the progress clock
pub const RESUMED_FLEET_REASON: &str = "DeploymentResumed";

// Available reasons

pub const MINIMUM_REPLICAS_AVAILABLE: &str = "MinimumReplicasAvailable";
pub const MINIMUM_REPLICAS_UNAVAILABLE: &str = "MinimumReplicasUnavailable";

// Rollback event reasons

pub const ROLLBACK_REVISION_NOT_FOUND: &str = "DeploymentRollbackRevisionNotFound";
pub const ROLLBACK_TEMPLATE_UNCHANGED: &str = "DeploymentRollbackTemplateUnchanged";
pub const ROLLBACK_DONE: &str = "DeploymentRollback";

/// Build a condition stamped with `now` as both update and transition time
pub fn new_fleet_condition(
    type_: FleetConditionType,
    status: ConditionStatus,
    reason: impl Into<String>,
    message: impl Into<String>,
    now: DateTime<Utc>,
) -> FleetCondition {
    FleetCondition {
        type_,
        status,
        last_update_time: Some(now),
        last_transition_time: Some(now),
        reason: reason.into(),
        message: message.into(),
    }
}

/// Return the condition with the provided type, if any
pub fn get_fleet_condition<'a>(
    status: &'a FleetStatus,
    type_: &FleetConditionType,
) -> Option<&'a FleetCondition> {
    status.conditions.iter().find(|c| &c.type_ == type_)
}

/// Put `condition` into the ledger
///
/// A condition of the same type with the same status and reason is left
/// untouched. If only the reason differs the previous transition time is
/// kept. Any older entry of that type is dropped and the new one appended.
pub fn set_fleet_condition(status: &mut FleetStatus, mut condition: FleetCondition) {
    if let Some(current) = get_fleet_condition(status, &condition.type_) {
        if current.status == condition.status && current.reason == condition.reason {
            return;
        }
        if current.status == condition.status {
            condition.last_transition_time = current.last_transition_time;
        }
    }

    remove_fleet_condition(status, &condition.type_);
    status.conditions.push(condition);
}

/// Drop every condition of the provided type
pub fn remove_fleet_condition(status: &mut FleetStatus, type_: &FleetConditionType) {
    status.conditions.retain(|c| &c.type_ != type_);
}

/// Promote a replica-set condition (e.g. ReplicaFailure) into a fleet condition
///
/// Both timestamps take the replica-set's transition time.
pub fn replica_set_to_fleet_condition(condition: &ReplicaSetCondition) -> FleetCondition {
    FleetCondition {
        type_: FleetConditionType::from(condition.type_.clone()),
        status: ConditionStatus::from(condition.status.as_str()),
        last_update_time: condition.last_transition_time,
        last_transition_time: condition.last_transition_time,
        reason: condition.reason.clone(),
        message: condition.message.clone(),
    }
}
