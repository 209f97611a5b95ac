use super::annotations::{get_max_replicas_annotation, DESIRED_REPLICAS_ANNOTATION};
use super::error::FleetError;
use super::replicaset::{
    filter_active_replica_sets, find_active_or_latest, replica_count, sort_replica_sets, SortKey,
};
use crate::crd::{Fleet, FleetReplicaSet};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::borrow::Borrow;
use tracing::{debug, warn};

pub const ROLLING_UPDATE_STRATEGY: &str = "RollingUpdate";
pub const RECREATE_STRATEGY: &str = "Recreate";

/// Default maxSurge/maxUnavailable when a rolling fleet omits `rollingUpdate`
const DEFAULT_ROLLING_PERCENT: &str = "25%";

/// Strategy type of the fleet; an absent type means RollingUpdate
pub fn strategy_type(fleet: &Fleet) -> &str {
    fleet
        .spec
        .strategy
        .type_
        .as_deref()
        .unwrap_or(ROLLING_UPDATE_STRATEGY)
}

pub fn is_rolling_update(fleet: &Fleet) -> bool {
    strategy_type(fleet) == ROLLING_UPDATE_STRATEGY
}

/// maxSurge and maxUnavailable as written on the fleet
///
/// A fleet without a `rollingUpdate` block gets 25% for both.
fn rolling_update_bounds(fleet: &Fleet) -> (Option<IntOrString>, Option<IntOrString>) {
    match &fleet.spec.strategy.rolling_update {
        Some(rolling) => (rolling.max_surge.clone(), rolling.max_unavailable.clone()),
        None => (
            Some(IntOrString::String(DEFAULT_ROLLING_PERCENT.to_string())),
            Some(IntOrString::String(DEFAULT_ROLLING_PERCENT.to_string())),
        ),
    }
}

/// Resolve an absolute-or-percentage value against `total`
///
/// Percentages round up when `round_up` is set, down otherwise.
///
/// # Examples
/// ```ignore
/// let pct = IntOrString::String("25%".to_string());
/// assert_eq!(scaled_value_from_int_or_percent(&pct, 10, true)?, 3);  // 2.5 -> ceil
/// assert_eq!(scaled_value_from_int_or_percent(&pct, 10, false)?, 2); // 2.5 -> floor
/// assert_eq!(scaled_value_from_int_or_percent(&IntOrString::Int(5), 10, true)?, 5);
/// ```
///
/// # Errors
/// Returns ParseError for strings that are not an integer percentage
pub fn scaled_value_from_int_or_percent(
    value: &IntOrString,
    total: i32,
    round_up: bool,
) -> Result<i32, FleetError> {
    match value {
        IntOrString::Int(abs) => Ok(*abs),
        IntOrString::String(s) => {
            let percent_str = s
                .strip_suffix('%')
                .ok_or_else(|| FleetError::parse("IntOrString", s, "string is not a percentage"))?;
            let percent = percent_str
                .parse::<i32>()
                .map_err(|e| FleetError::parse("IntOrString", s, e))?;
            let scaled = (f64::from(total) * f64::from(percent)) / 100.0;
            Ok(if round_up {
                scaled.ceil() as i32
            } else {
                scaled.floor() as i32
            })
        }
    }
}

/// Resolve maxSurge and maxUnavailable together
///
/// Surge rounds up, unavailable rounds down. Absent values count as 0. If
/// both end up 0, unavailable becomes 1 so the rollout can still move when
/// surging is impossible (e.g. quota):
///
/// - 2 desired, unavailable 1%, surge 0%: old(-1), new(+1), old(-1), new(+1)
/// - 1 desired, unavailable 25%, surge 1%: new(+1), old(-1)
/// - 2 desired, unavailable 0%, surge 1%: new(+1), old(-1), new(+1), old(-1)
pub fn resolve_fenceposts(
    max_surge: Option<&IntOrString>,
    max_unavailable: Option<&IntOrString>,
    desired: i32,
) -> Result<(i32, i32), FleetError> {
    let zero = IntOrString::Int(0);
    let surge = scaled_value_from_int_or_percent(max_surge.unwrap_or(&zero), desired, true)?;
    let mut unavailable =
        scaled_value_from_int_or_percent(max_unavailable.unwrap_or(&zero), desired, false)?;

    if surge == 0 && unavailable == 0 {
        unavailable = 1;
    }

    Ok((surge, unavailable))
}

/// Resolved fenceposts of a rolling fleet, or None for other strategies and empty fleets
fn fleet_fenceposts(fleet: &Fleet) -> Option<(i32, i32)> {
    if !is_rolling_update(fleet) || fleet.spec.replicas == 0 {
        return None;
    }
    let (surge, unavailable) = rolling_update_bounds(fleet);
    match resolve_fenceposts(surge.as_ref(), unavailable.as_ref(), fleet.spec.replicas) {
        Ok(fenceposts) => Some(fenceposts),
        Err(e) => {
            // Admission validation rejects these; treat as no headroom.
            warn!(fleet = %fleet.name_any(), error = %e, "Invalid rolling update bounds");
            None
        }
    }
}

/// Maximum number of clusters a rolling fleet may run above its desired count
pub fn max_surge(fleet: &Fleet) -> i32 {
    fleet_fenceposts(fleet).map_or(0, |(surge, _)| surge)
}

/// Maximum number of unavailable clusters a rolling fleet tolerates, capped at its desired count
pub fn max_unavailable(fleet: &Fleet) -> i32 {
    fleet_fenceposts(fleet).map_or(0, |(_, unavailable)| unavailable.min(fleet.spec.replicas))
}

/// Minimum number of available clusters during a rolling update
pub fn min_available(fleet: &Fleet) -> i32 {
    if !is_rolling_update(fleet) {
        return 0;
    }
    fleet.spec.replicas - max_unavailable(fleet)
}

/// Replica count the fleet's new replica-set should have next
///
/// RollingUpdate grows the new replica-set up to the surge ceiling
/// (desired + maxSurge across all replica-sets) without passing the desired
/// count; at or above the ceiling it stays where it is. Recreate jumps
/// straight to the desired count.
///
/// # Errors
/// - UnsupportedStrategy for any other strategy type
/// - ParseError for an invalid maxSurge
pub fn new_rs_new_replicas<T: Borrow<FleetReplicaSet>>(
    fleet: &Fleet,
    all_rss: &[T],
    new_rs: &FleetReplicaSet,
) -> Result<i32, FleetError> {
    let desired = fleet.spec.replicas;
    match strategy_type(fleet) {
        ROLLING_UPDATE_STRATEGY => {
            let (surge, _) = rolling_update_bounds(fleet);
            let max_surge = match surge {
                Some(value) => scaled_value_from_int_or_percent(&value, desired, true)?,
                None => 0,
            };

            let current_pod_count = replica_count(all_rss);
            let max_total_pods = desired + max_surge;
            if current_pod_count >= max_total_pods {
                return Ok(new_rs.spec.replicas);
            }

            let scale_up_count =
                (max_total_pods - current_pod_count).min(desired - new_rs.spec.replicas);
            Ok(new_rs.spec.replicas + scale_up_count)
        }
        RECREATE_STRATEGY => Ok(desired),
        other => Err(FleetError::UnsupportedStrategy(other.to_string())),
    }
}

/// Share of a pending scale delta the replica-set should take
///
/// `to_add` is the total change across the fleet and `added` what has been
/// handed out so far. The result never overshoots what is left: at most
/// `to_add - added` when scaling up, at least `to_add - added` when scaling
/// down.
pub fn get_proportion(rs: Option<&FleetReplicaSet>, fleet: &Fleet, to_add: i32, added: i32) -> i32 {
    let Some(rs) = rs else {
        return 0;
    };
    if rs.spec.replicas == 0 || to_add == 0 || to_add == added {
        return 0;
    }

    let rs_fraction = replica_set_fraction(rs, fleet);
    let allowed = to_add - added;

    if to_add > 0 {
        rs_fraction.min(allowed)
    } else {
        rs_fraction.max(allowed)
    }
}

/// Estimated replica delta for `rs` when the fleet is resized mid-rollout
///
/// Scales the replica-set by (desired + maxSurge) / max-replicas annotation.
/// Without the annotation the fleet's last observed size is the base.
fn replica_set_fraction(rs: &FleetReplicaSet, fleet: &Fleet) -> i32 {
    // Scaling to zero removes the whole replica-set.
    if fleet.spec.replicas == 0 {
        return -rs.spec.replicas;
    }

    let fleet_replicas = fleet.spec.replicas + max_surge(fleet);
    let annotated_replicas = match get_max_replicas_annotation(rs) {
        Some(v) => v,
        None => fleet
            .status
            .as_ref()
            .map(|status| status.replicas)
            .unwrap_or_default(),
    };
    if annotated_replicas <= 0 {
        debug!(replicaset = %rs.name_any(), "No base size to estimate replica set proportion");
        return 0;
    }

    let new_rs_size = (i64::from(rs.spec.replicas) * i64::from(fleet_replicas)) as f64
        / f64::from(annotated_replicas);
    new_rs_size.round() as i32 - rs.spec.replicas
}

/// True once the replica-set holds every desired cluster of the fleet, available
pub fn is_saturated(fleet: &Fleet, rs: Option<&FleetReplicaSet>) -> bool {
    let Some(rs) = rs else {
        return false;
    };
    let Some(desired) = rs
        .annotations()
        .get(DESIRED_REPLICAS_ANNOTATION)
        .and_then(|v| v.parse::<i32>().ok())
    else {
        return false;
    };
    let available = rs
        .status
        .as_ref()
        .map(|status| status.available_replicas)
        .unwrap_or_default();

    rs.spec.replicas == fleet.spec.replicas
        && desired == fleet.spec.replicas
        && available == fleet.spec.replicas
}

/// One replica-set resize in a scaling plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaSetScale {
    pub name: String,
    pub from: i32,
    pub to: i32,
}

/// Plan the replica counts for a pure scaling event
///
/// - A single active (or, with none active, the latest) replica-set takes the
///   whole fleet size.
/// - A saturated new replica-set means every old one goes to zero.
/// - Otherwise, for rolling fleets, `desired + maxSurge - current` is spread
///   over the active replica-sets with [`get_proportion`], newest first when
///   growing and oldest first when shrinking. Rounding leftovers land on the
///   first (largest) replica-set.
///
/// Only replica-sets whose count changes are returned.
pub fn scale_proportionally<T: Borrow<FleetReplicaSet>>(
    fleet: &Fleet,
    new_rs: Option<&FleetReplicaSet>,
    old_rss: &[T],
) -> Vec<ReplicaSetScale> {
    let desired = fleet.spec.replicas;
    let resize = |rs: &FleetReplicaSet, to: i32| ReplicaSetScale {
        name: rs.name_any(),
        from: rs.spec.replicas,
        to,
    };

    if let Some(active) = find_active_or_latest(new_rs, old_rss) {
        if active.spec.replicas == desired {
            return Vec::new();
        }
        return vec![resize(active, desired)];
    }

    if is_saturated(fleet, new_rs) {
        return filter_active_replica_sets(old_rss)
            .into_iter()
            .map(|old| resize(old, 0))
            .collect();
    }

    if !is_rolling_update(fleet) {
        return Vec::new();
    }

    let mut all_rss: Vec<&FleetReplicaSet> = old_rss.iter().map(Borrow::borrow).collect();
    all_rss.extend(new_rs);
    let mut all_rss = filter_active_replica_sets(&all_rss);

    let allowed_size = if desired > 0 {
        desired + max_surge(fleet)
    } else {
        0
    };
    let to_add = allowed_size - replica_count(&all_rss);
    if to_add > 0 {
        sort_replica_sets(&mut all_rss, SortKey::BySizeNewerFirst);
    } else if to_add < 0 {
        sort_replica_sets(&mut all_rss, SortKey::BySizeOlderFirst);
    }

    let mut added = 0;
    let mut targets: Vec<i32> = Vec::with_capacity(all_rss.len());
    for rs in &all_rss {
        let proportion = get_proportion(Some(*rs), fleet, to_add, added);
        targets.push(rs.spec.replicas + proportion);
        added += proportion;
    }
    if let Some(first) = targets.first_mut() {
        *first = (*first + to_add - added).max(0);
    }

    debug!(fleet = %fleet.name_any(), to_add, added, "Planned proportional scaling");

    all_rss
        .into_iter()
        .zip(targets)
        .filter(|(rs, to)| rs.spec.replicas != *to)
        .map(|(rs, to)| resize(rs, to))
        .collect()
}
