use super::conditions::{
    get_fleet_condition, new_fleet_condition, set_fleet_condition, MINIMUM_REPLICAS_AVAILABLE,
    MINIMUM_REPLICAS_UNAVAILABLE, NEW_RS_AVAILABLE_REASON, TIMED_OUT_REASON,
};
use super::error::FleetError;
use super::replicaset::{actual_replica_count, available_replica_count, ready_replica_count, replica_count};
use super::rolling::max_unavailable;
use crate::crd::{ConditionStatus, Fleet, FleetConditionType, FleetReplicaSet, FleetStatus};
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use std::borrow::Borrow;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// True if progressDeadlineSeconds is set to something other than the unbounded sentinel
pub fn has_progress_deadline(fleet: &Fleet) -> bool {
    fleet
        .spec
        .progress_deadline_seconds
        .is_some_and(|seconds| seconds != i32::MAX)
}

/// True if revisionHistoryLimit is set to something other than the unbounded sentinel
pub fn has_revision_history_limit(fleet: &Fleet) -> bool {
    fleet
        .spec
        .revision_history_limit
        .is_some_and(|limit| limit != i32::MAX)
}

/// Every desired cluster is updated and available, nothing old is left, and
/// the status belongs to the fleet's current generation
pub fn fleet_complete(fleet: &Fleet, new_status: &FleetStatus) -> bool {
    let desired = fleet.spec.replicas;
    let generation = fleet.metadata.generation.unwrap_or_default();

    new_status.updated_replicas == desired
        && new_status.replicas == desired
        && new_status.available_replicas == desired
        && new_status.observed_generation.unwrap_or_default() >= generation
}

/// Whether `new_status` moved forward from the status last recorded on the fleet
///
/// Progress means more updated, ready or available clusters, or fewer old
/// ones left to scale down.
pub fn fleet_progressing(fleet: &Fleet, new_status: &FleetStatus) -> bool {
    let old_status = fleet.status.clone().unwrap_or_default();

    let old_status_old_replicas = old_status.replicas - old_status.updated_replicas;
    let new_status_old_replicas = new_status.replicas - new_status.updated_replicas;

    new_status.updated_replicas > old_status.updated_replicas
        || new_status_old_replicas < old_status_old_replicas
        || new_status.ready_replicas > old_status.ready_replicas
        || new_status.available_replicas > old_status.available_replicas
}

/// Whether the rollout has exceeded its progress deadline at `now`
///
/// The Progressing condition is the baseline. Without it there is nothing to
/// measure from. A condition that already reports success never times out,
/// and one that already reports a timeout stays timed out.
pub fn fleet_timed_out(fleet: &Fleet, new_status: &FleetStatus, now: DateTime<Utc>) -> bool {
    let Some(deadline) = fleet
        .spec
        .progress_deadline_seconds
        .filter(|_| has_progress_deadline(fleet))
    else {
        return false;
    };

    let Some(condition) = get_fleet_condition(new_status, &FleetConditionType::Progressing) else {
        return false;
    };
    match condition.reason.as_str() {
        NEW_RS_AVAILABLE_REASON => return false,
        TIMED_OUT_REASON => return true,
        _ => {}
    }

    let Some(from) = condition.last_update_time else {
        return false;
    };
    let timed_out = from + chrono::Duration::seconds(i64::from(deadline)) < now;

    debug!(fleet = %fleet.name_any(), timed_out, from = %from, now = %now,
        "Fleet timed out from last progress check");
    timed_out
}

/// A pure resize rather than a template rollout
///
/// The children's observed cluster total no longer matches what the fleet
/// last recorded.
pub fn is_scaling_event<T: Borrow<FleetReplicaSet>>(fleet: &Fleet, rs_list: &[T]) -> bool {
    let recorded = fleet
        .status
        .as_ref()
        .map(|status| status.replicas)
        .unwrap_or_default();
    actual_replica_count(rs_list) != recorded
}

/// Fresh status for the fleet, derived from its replica-sets
///
/// Conditions and collision count carry over from the current status; the
/// Available condition is refreshed against the minimum availability.
pub fn calculate_status<T: Borrow<FleetReplicaSet>>(
    fleet: &Fleet,
    all_rss: &[T],
    new_rs: Option<&FleetReplicaSet>,
    now: DateTime<Utc>,
) -> FleetStatus {
    let available_replicas = available_replica_count(all_rss);
    let total_replicas = replica_count(all_rss);
    let unavailable_replicas = (total_replicas - available_replicas).max(0);
    let previous = fleet.status.clone().unwrap_or_default();

    let mut status = FleetStatus {
        observed_generation: fleet.metadata.generation,
        replicas: actual_replica_count(all_rss),
        updated_replicas: new_rs.map_or(0, |rs| actual_replica_count(&[rs])),
        ready_replicas: ready_replica_count(all_rss),
        available_replicas,
        unavailable_replicas,
        conditions: previous.conditions,
        collision_count: previous.collision_count,
    };

    let condition = if available_replicas >= fleet.spec.replicas - max_unavailable(fleet) {
        new_fleet_condition(
            FleetConditionType::Available,
            ConditionStatus::True,
            MINIMUM_REPLICAS_AVAILABLE,
            "Fleet has minimum availability.",
            now,
        )
    } else {
        new_fleet_condition(
            FleetConditionType::Available,
            ConditionStatus::False,
            MINIMUM_REPLICAS_UNAVAILABLE,
            "Fleet does not have minimum availability.",
            now,
        )
    };
    set_fleet_condition(&mut status, condition);

    status
}

/// Poll `get_fleet` until its observed generation reaches `desired_generation`
///
/// Checks once immediately, then every `interval`. Getter errors end the
/// wait straight away.
///
/// # Errors
/// - Timeout if `timeout` elapses first
/// - whatever the getter returns
pub async fn wait_for_observed_generation<F, Fut>(
    mut get_fleet: F,
    desired_generation: i64,
    interval: Duration,
    timeout: Duration,
) -> Result<(), FleetError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Fleet, FleetError>>,
{
    let poll = poll_observed_generation(&mut get_fleet, desired_generation, interval);
    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(FleetError::Timeout {
            desired_generation,
            timeout,
        }),
    }
}

async fn poll_observed_generation<F, Fut>(
    get_fleet: &mut F,
    desired_generation: i64,
    interval: Duration,
) -> Result<(), FleetError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Fleet, FleetError>>,
{
    loop {
        let fleet = get_fleet().await?;
        let observed = fleet
            .status
            .as_ref()
            .and_then(|status| status.observed_generation)
            .unwrap_or_default();
        if observed >= desired_generation {
            return Ok(());
        }
        debug!(fleet = %fleet.name_any(), observed, desired_generation, "Waiting for fleet observed generation");
        tokio::time::sleep(interval).await;
    }
}
