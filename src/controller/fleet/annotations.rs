use super::error::FleetError;
use super::rolling::max_surge;
use crate::crd::{Fleet, FleetReplicaSet};
use kube::{Resource, ResourceExt};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Rollout sequence number of a fleet and of each of its replica-sets
pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";
/// Old revisions a replica-set has served, comma separated, oldest first
pub const REVISION_HISTORY_ANNOTATION: &str = "deployment.kubernetes.io/revision-history";
/// Fleet replicas recorded on a replica-set. Separates scaling events from
/// rollouts and tells whether the new replica-set is really saturated.
pub const DESIRED_REPLICAS_ANNOTATION: &str = "deployment.kubernetes.io/desired-replicas";
/// Fleet replicas + maxSurge recorded on a replica-set, the base for its
/// proportional share when the fleet is scaled mid-rollout
pub const MAX_REPLICAS_ANNOTATION: &str = "deployment.kubernetes.io/max-replicas";
/// Written by `kubectl apply`, never propagated
pub const LAST_APPLIED_CONFIG_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";
/// Legacy rollback request annotation, never propagated
pub const DEPRECATED_ROLLBACK_TO_ANNOTATION: &str = "deprecated.deployment.rollback.to";

const ANNOTATIONS_TO_SKIP: [&str; 6] = [
    LAST_APPLIED_CONFIG_ANNOTATION,
    REVISION_ANNOTATION,
    REVISION_HISTORY_ANNOTATION,
    DESIRED_REPLICAS_ANNOTATION,
    MAX_REPLICAS_ANNOTATION,
    DEPRECATED_ROLLBACK_TO_ANNOTATION,
];

/// Annotations owned by the rollout bookkeeping, never copied between fleet and replica-set
pub fn skip_copy_annotation(key: &str) -> bool {
    ANNOTATIONS_TO_SKIP.contains(&key)
}

/// Revision number of any fleet or replica-set
///
/// A missing annotation is revision 0.
///
/// # Errors
/// Returns ParseError if the annotation is not an integer
pub fn revision<K: Resource>(obj: &K) -> Result<i64, FleetError> {
    match obj.annotations().get(REVISION_ANNOTATION) {
        None => Ok(0),
        Some(v) => v
            .parse::<i64>()
            .map_err(|e| FleetError::parse(REVISION_ANNOTATION, v, e)),
    }
}

/// Highest revision among the replica-sets, skipping unparsable ones
pub fn max_revision<T: Borrow<FleetReplicaSet>>(all_rss: &[T]) -> i64 {
    let mut max = 0;
    for rs in all_rss {
        let rs = rs.borrow();
        match revision(rs) {
            Ok(v) if v > max => max = v,
            Ok(_) => {}
            Err(e) => {
                debug!(replicaset = %rs.name_any(), error = %e,
                    "Couldn't parse revision for replica set, skipping it when reconciling revisions");
            }
        }
    }
    max
}

/// Second highest revision among the replica-sets (the last revision)
///
/// A replica-set tying the current max still pushes the previous max down
/// into second place, so two replica-sets at revision 3 yield 3.
pub fn last_revision<T: Borrow<FleetReplicaSet>>(all_rss: &[T]) -> i64 {
    let (mut max, mut sec_max) = (0, 0);
    for rs in all_rss {
        let rs = rs.borrow();
        match revision(rs) {
            Ok(v) if v >= max => {
                sec_max = max;
                max = v;
            }
            Ok(v) if v > sec_max => sec_max = v,
            Ok(_) => {}
            Err(e) => {
                debug!(replicaset = %rs.name_any(), error = %e,
                    "Couldn't parse revision for replica set, skipping it when reconciling revisions");
            }
        }
    }
    sec_max
}

/// Write the fleet's revision annotation; returns true if it changed
pub fn set_fleet_revision(fleet: &mut Fleet, revision: &str) -> bool {
    let annotations = fleet.annotations_mut();
    if annotations.get(REVISION_ANNOTATION).map(String::as_str) == Some(revision) {
        return false;
    }
    annotations.insert(REVISION_ANNOTATION.to_string(), revision.to_string());
    true
}

/// Bring the new replica-set's annotations in line with the fleet
///
/// Copies the fleet's annotations (except the bookkeeping ones), raises the
/// revision to `new_revision` if it is behind, and records the revision it
/// replaced in the revision history when the replica-set already carried the
/// annotation (a rollback to this replica-set). An empty annotation counts and
/// is recorded as an empty history entry. The history is trimmed from the oldest
/// end to stay within `rev_history_limit_in_chars`. Replica-sets about to be
/// created (`exists == false`) also get the desired/max replicas annotations.
///
/// An unparsable current or new revision stops the update and returns false,
/// so a valid history is never overwritten based on garbage.
///
/// Returns true if any annotation changed.
pub fn set_new_replica_set_annotations(
    fleet: &Fleet,
    new_rs: &mut FleetReplicaSet,
    new_revision: &str,
    exists: bool,
    rev_history_limit_in_chars: usize,
) -> bool {
    let mut annotation_changed = copy_fleet_annotations_to_replica_set(fleet, new_rs);

    let rs_name = new_rs.name_any();
    let annotations = new_rs.annotations_mut();
    let old_revision = annotations.get(REVISION_ANNOTATION).cloned();

    let old_revision_int = match old_revision.as_deref() {
        None | Some("") => 0,
        Some(v) => match v.parse::<i64>() {
            Ok(parsed) => parsed,
            Err(e) => {
                info!(replicaset = %rs_name, old_revision = %v, error = %e,
                    "Not updating replica set revision: old revision is not an integer");
                return false;
            }
        },
    };
    let new_revision_int = match new_revision.parse::<i64>() {
        Ok(parsed) => parsed,
        Err(e) => {
            info!(replicaset = %rs_name, new_revision = %new_revision, error = %e,
                "Not updating replica set revision: new revision is not an integer");
            return false;
        }
    };

    // The new replica-set's revision is normally the max of all old ones + 1,
    // but old replica-sets may be deleted after it was bumped. Never lower it.
    if old_revision_int < new_revision_int {
        annotations.insert(REVISION_ANNOTATION.to_string(), new_revision.to_string());
        annotation_changed = true;
        debug!(replicaset = %rs_name, new_revision = %new_revision, "Updating replica set revision");

        // Already had a revision annotation, even an empty one: this is a
        // rollback to an older replica-set.
        if let Some(old) = old_revision.as_deref() {
            let history = annotations
                .get(REVISION_HISTORY_ANNOTATION)
                .map(String::as_str)
                .unwrap_or_default();
            match append_revision_history(history, old, rev_history_limit_in_chars) {
                Some(updated) => {
                    annotations.insert(REVISION_HISTORY_ANNOTATION.to_string(), updated);
                }
                None => {
                    info!(replicaset = %rs_name, revision_history_limit = rev_history_limit_in_chars,
                        "Not appending revision due to revision history length limit reached");
                }
            }
        }
    }

    if !exists {
        let desired = fleet.spec.replicas;
        if set_replicas_annotations(new_rs, desired, desired + max_surge(fleet)) {
            annotation_changed = true;
        }
    }

    annotation_changed
}

/// Append `old_revision` to `history`, dropping the oldest entries until the
/// result fits in `limit` characters. None if even the lone entry doesn't fit.
fn append_revision_history(history: &str, old_revision: &str, limit: usize) -> Option<String> {
    if history.is_empty() {
        return (old_revision.len() <= limit).then(|| old_revision.to_string());
    }

    let entries: Vec<&str> = history.split(',').collect();
    let mut total_len = history.len() + old_revision.len() + 1;
    let mut start = 0;
    while total_len > limit && start < entries.len() {
        total_len -= entries[start].len() + 1;
        start += 1;
    }
    if total_len > limit {
        return None;
    }

    let mut kept = entries[start..].to_vec();
    kept.push(old_revision);
    Some(kept.join(","))
}

/// Copy fleet annotations onto the replica-set; returns true if any changed
///
/// The fleet's own revision is deliberately not copied: the replica-set's
/// revision is authoritative and the fleet copies it, not the other way round.
fn copy_fleet_annotations_to_replica_set(fleet: &Fleet, rs: &mut FleetReplicaSet) -> bool {
    let mut changed = false;
    let rs_annotations = rs.annotations_mut();
    for (k, v) in fleet.annotations() {
        if skip_copy_annotation(k) || rs_annotations.get(k) == Some(v) {
            continue;
        }
        rs_annotations.insert(k.clone(), v.clone());
        changed = true;
    }
    changed
}

/// Replace the fleet's annotations with those of the replica-set it rolls back to
///
/// Bookkeeping annotations already on the fleet are kept, everything else
/// comes from `rollback_to_rs`.
pub fn set_fleet_annotations_to(fleet: &mut Fleet, rollback_to_rs: &FleetReplicaSet) {
    let mut annotations: BTreeMap<String, String> = fleet
        .annotations()
        .iter()
        .filter(|(k, _)| skip_copy_annotation(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    for (k, v) in rollback_to_rs.annotations() {
        if !skip_copy_annotation(k) {
            annotations.insert(k.clone(), v.clone());
        }
    }

    fleet.metadata.annotations = Some(annotations);
}

/// Fleet replicas recorded on the replica-set, if present and valid
pub fn get_desired_replicas_annotation(rs: &FleetReplicaSet) -> Option<i32> {
    int_from_annotation(rs, DESIRED_REPLICAS_ANNOTATION)
}

/// Fleet replicas + maxSurge recorded on the replica-set, if present and valid
pub fn get_max_replicas_annotation(rs: &FleetReplicaSet) -> Option<i32> {
    int_from_annotation(rs, MAX_REPLICAS_ANNOTATION)
}

fn int_from_annotation(rs: &FleetReplicaSet, key: &str) -> Option<i32> {
    let value = rs.annotations().get(key)?;
    match value.parse::<i32>() {
        Ok(v) => Some(v),
        Err(e) => {
            info!(replicaset = %rs.name_any(), annotation = key, value = %value, error = %e,
                "Could not convert annotation value for the replica set");
            None
        }
    }
}

/// Record desired and max replicas on the replica-set; returns true if either changed
pub fn set_replicas_annotations(rs: &mut FleetReplicaSet, desired: i32, max: i32) -> bool {
    let annotations = rs.annotations_mut();
    let mut updated = false;
    for (key, value) in [
        (DESIRED_REPLICAS_ANNOTATION, desired.to_string()),
        (MAX_REPLICAS_ANNOTATION, max.to_string()),
    ] {
        if annotations.get(key) != Some(&value) {
            annotations.insert(key.to_string(), value);
            updated = true;
        }
    }
    updated
}

/// True if [`set_replicas_annotations`] would change anything
pub fn replicas_annotations_need_update(rs: &FleetReplicaSet, desired: i32, max: i32) -> bool {
    let annotations = rs.annotations();
    annotations.get(DESIRED_REPLICAS_ANNOTATION) != Some(&desired.to_string())
        || annotations.get(MAX_REPLICAS_ANNOTATION) != Some(&max.to_string())
}
