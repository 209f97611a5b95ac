use super::annotations::revision;
use super::error::FleetError;
use super::listers::{FleetLister, PodLister, ReplicaSetLister};
use super::selector::{label_selector_to_string, selector_is_empty, selector_matches};
use crate::crd::{ClusterTemplateSpec, Fleet, FleetReplicaSet};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Label carrying the template hash on replica-sets and their clusters
pub const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";
/// Label carrying the owning fleet's name on replica-sets and their clusters
pub const FLEET_NAME_LABEL: &str = "orchestration.kulta.io/fleet-name";

const IDENTITY_LABELS: [&str; 2] = [POD_TEMPLATE_HASH_LABEL, FLEET_NAME_LABEL];

/// The owner reference marked as controller, if any
pub fn controller_of(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// True if `obj`'s controller reference points at `owner`
pub fn is_controlled_by<K: Resource, O: Resource>(obj: &K, owner: &O) -> bool {
    match (controller_of(obj.meta()), owner.meta().uid.as_deref()) {
        (Some(controller), Some(uid)) => controller.uid == uid,
        _ => false,
    }
}

/// Replica-sets the fleet selects and controls
///
/// Selector matches without a controller reference to this fleet are
/// dropped. Adoption and orphaning are left to the reconciler.
///
/// # Errors
/// SelectorError for an invalid fleet selector, or whatever the lister fails with
pub async fn list_replica_sets(
    fleet: &Fleet,
    lister: &dyn ReplicaSetLister,
) -> Result<Vec<FleetReplicaSet>, FleetError> {
    let namespace = fleet.namespace().unwrap_or_default();
    let selector = label_selector_to_string(&fleet.spec.selector)?;

    let all = lister.list_replica_sets(&namespace, &selector).await?;
    let total = all.len();
    let owned: Vec<FleetReplicaSet> = all
        .into_iter()
        .filter(|rs| is_controlled_by(rs, fleet))
        .collect();

    debug!(fleet = %fleet.name_any(), selected = total, owned = owned.len(), "Listed replica sets");
    Ok(owned)
}

/// Pods the fleet selects whose controller is one of `rs_list`
///
/// # Errors
/// SelectorError for an invalid fleet selector, or whatever the lister fails with
pub async fn list_pods<T: Borrow<FleetReplicaSet>>(
    fleet: &Fleet,
    rs_list: &[T],
    lister: &dyn PodLister,
) -> Result<Vec<Pod>, FleetError> {
    let namespace = fleet.namespace().unwrap_or_default();
    let selector = label_selector_to_string(&fleet.spec.selector)?;

    let rs_uids: HashSet<&str> = rs_list
        .iter()
        .filter_map(|rs| rs.borrow().metadata.uid.as_deref())
        .collect();

    let all = lister.list_pods(&namespace, &selector).await?;
    Ok(all
        .into_iter()
        .filter(|pod| {
            controller_of(&pod.metadata).is_some_and(|owner| rs_uids.contains(owner.uid.as_str()))
        })
        .collect())
}

fn strip_identity_labels(metadata: &mut Option<ObjectMeta>) {
    if let Some(meta) = metadata.as_mut() {
        if let Some(map) = meta.labels.as_mut() {
            for key in IDENTITY_LABELS {
                map.remove(key);
            }
            if map.is_empty() {
                meta.labels = None;
            }
        }
        // Absent and empty metadata are the same template
        if *meta == ObjectMeta::default() {
            *metadata = None;
        }
    }
}

fn without_identity_labels(template: &ClusterTemplateSpec) -> ClusterTemplateSpec {
    let mut copy = template.clone();
    strip_identity_labels(&mut copy.metadata);
    strip_identity_labels(&mut copy.spec.head_group_spec.template.metadata);
    for worker in &mut copy.spec.worker_group_specs {
        strip_identity_labels(&mut worker.template.metadata);
    }
    copy
}

/// Compare two templates ignoring the template-hash and fleet-name labels
///
/// The fleet's own template never carries these labels, and the hash label
/// changes whenever the template's serialized shape does. Empty and absent
/// label maps compare equal, as do empty and absent metadata.
pub fn equal_ignore_hash(t1: &ClusterTemplateSpec, t2: &ClusterTemplateSpec) -> bool {
    without_identity_labels(t1) == without_identity_labels(t2)
}

/// The replica-set running the fleet's current template
///
/// Duplicates can briefly coexist (e.g. after a controller upgrade changes
/// hashing), so the oldest match wins.
pub fn find_new_replica_set<'a, T: Borrow<FleetReplicaSet>>(
    fleet: &Fleet,
    rs_list: &'a [T],
) -> Option<&'a FleetReplicaSet> {
    let mut sorted: Vec<&FleetReplicaSet> = rs_list.iter().map(Borrow::borrow).collect();
    sort_replica_sets(&mut sorted, SortKey::ByCreationTime);
    sorted
        .into_iter()
        .find(|rs| equal_ignore_hash(&rs.spec.template, &fleet.spec.template))
}

/// Split off the old replica-sets: (those with replicas, all of them)
pub fn find_old_replica_sets<'a, T: Borrow<FleetReplicaSet>>(
    fleet: &Fleet,
    rs_list: &'a [T],
) -> (Vec<&'a FleetReplicaSet>, Vec<&'a FleetReplicaSet>) {
    let new_rs = find_new_replica_set(fleet, rs_list);
    let all_old: Vec<&FleetReplicaSet> = rs_list
        .iter()
        .map(Borrow::borrow)
        .filter(|rs| !new_rs.is_some_and(|new_rs| std::ptr::eq(*rs, new_rs)))
        .collect();
    let with_replicas = all_old
        .iter()
        .copied()
        .filter(|rs| rs.spec.replicas != 0)
        .collect();
    (with_replicas, all_old)
}

/// The only active replica-set, or the latest one if none is active
///
/// None when several are active; those have to be scaled proportionally.
pub fn find_active_or_latest<'a, T: Borrow<FleetReplicaSet>>(
    new_rs: Option<&'a FleetReplicaSet>,
    old_rss: &'a [T],
) -> Option<&'a FleetReplicaSet> {
    let mut old_sorted: Vec<&FleetReplicaSet> = old_rss.iter().map(Borrow::borrow).collect();
    sort_replica_sets(&mut old_sorted, SortKey::ByCreationTime);
    old_sorted.reverse();

    let active: Vec<&'a FleetReplicaSet> = old_sorted
        .iter()
        .copied()
        .chain(new_rs)
        .filter(|rs| rs.spec.replicas > 0)
        .collect();

    match active.as_slice() {
        [] => new_rs.or_else(|| old_sorted.first().copied()),
        [only] => Some(*only),
        _ => None,
    }
}

/// Copy a replica-set template back onto the fleet (rollback)
///
/// The template-hash label is not carried over.
pub fn set_from_replica_set_template(fleet: &mut Fleet, template: &ClusterTemplateSpec) {
    let mut template = template.clone();
    if let Some(labels) = template
        .metadata
        .as_mut()
        .and_then(|meta| meta.labels.as_mut())
    {
        labels.remove(POD_TEMPLATE_HASH_LABEL);
    }
    fleet.spec.template = template;
}

/// Sum of desired replicas
pub fn replica_count<T: Borrow<FleetReplicaSet>>(rss: &[T]) -> i32 {
    rss.iter().map(|rs| rs.borrow().spec.replicas).sum()
}

fn status_sum<T: Borrow<FleetReplicaSet>>(
    rss: &[T],
    field: impl Fn(&crate::crd::FleetReplicaSetStatus) -> i32,
) -> i32 {
    rss.iter()
        .filter_map(|rs| rs.borrow().status.as_ref())
        .map(field)
        .sum()
}

/// Sum of observed replicas
pub fn actual_replica_count<T: Borrow<FleetReplicaSet>>(rss: &[T]) -> i32 {
    status_sum(rss, |s| s.replicas)
}

pub fn ready_replica_count<T: Borrow<FleetReplicaSet>>(rss: &[T]) -> i32 {
    status_sum(rss, |s| s.ready_replicas)
}

pub fn available_replica_count<T: Borrow<FleetReplicaSet>>(rss: &[T]) -> i32 {
    status_sum(rss, |s| s.available_replicas)
}

/// Replica-sets matching `filter`
pub fn filter_replica_sets<T, F>(rss: &[T], filter: F) -> Vec<&FleetReplicaSet>
where
    T: Borrow<FleetReplicaSet>,
    F: Fn(&FleetReplicaSet) -> bool,
{
    rss.iter()
        .filter_map(|rs| {
            let rs: &FleetReplicaSet = rs.borrow();
            filter(rs).then_some(rs)
        })
        .collect()
}

/// Replica-sets that have, or ought to have, clusters
pub fn filter_active_replica_sets<T: Borrow<FleetReplicaSet>>(rss: &[T]) -> Vec<&FleetReplicaSet> {
    filter_replica_sets(rss, |rs| rs.spec.replicas > 0)
}

/// Orderings for replica-set lists; every one is total, with name as the last tie-break
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Oldest first, then by name
    ByCreationTime,
    /// Lowest revision first, unparsable counting as 0; equal revisions oldest first
    ByRevision,
    /// Largest first; equal sizes oldest first
    BySizeOlderFirst,
    /// Largest first; equal sizes newest first
    BySizeNewerFirst,
}

fn by_creation_time(a: &FleetReplicaSet, b: &FleetReplicaSet) -> Ordering {
    a.metadata
        .creation_timestamp
        .cmp(&b.metadata.creation_timestamp)
        .then_with(|| a.metadata.name.cmp(&b.metadata.name))
}

pub fn compare_replica_sets(key: SortKey, a: &FleetReplicaSet, b: &FleetReplicaSet) -> Ordering {
    match key {
        SortKey::ByCreationTime => by_creation_time(a, b),
        SortKey::ByRevision => revision(a)
            .unwrap_or_default()
            .cmp(&revision(b).unwrap_or_default())
            .then_with(|| by_creation_time(a, b)),
        SortKey::BySizeOlderFirst => b
            .spec
            .replicas
            .cmp(&a.spec.replicas)
            .then_with(|| by_creation_time(a, b)),
        SortKey::BySizeNewerFirst => b
            .spec
            .replicas
            .cmp(&a.spec.replicas)
            .then_with(|| by_creation_time(b, a)),
    }
}

/// Stable sort of `rss` by `key`
pub fn sort_replica_sets<T: Borrow<FleetReplicaSet>>(rss: &mut [T], key: SortKey) {
    rss.sort_by(|a, b| compare_replica_sets(key, a.borrow(), b.borrow()));
}

/// Fleets in the replica-set's namespace whose selector matches its labels
///
/// Only the fleet named in the controller reference manages it, but every
/// candidate is returned. Fleets with an invalid selector are skipped, and
/// an empty selector matches nothing here.
///
/// # Errors
/// NotFound if the replica-set has no labels or no fleet matches
pub async fn get_fleets_for_replica_set(
    rs: &FleetReplicaSet,
    lister: &dyn FleetLister,
) -> Result<Vec<Fleet>, FleetError> {
    let rs_labels = rs.labels();
    if rs_labels.is_empty() {
        return Err(FleetError::NotFound(format!(
            "no fleets found for replica set {} because it has no labels",
            rs.name_any()
        )));
    }

    let namespace = rs.namespace().unwrap_or_default();
    let mut fleets = Vec::new();
    for fleet in lister.list_fleets(&namespace).await? {
        match selector_matches(&fleet.spec.selector, rs_labels) {
            Ok(true) if !selector_is_empty(&fleet.spec.selector) => fleets.push(fleet),
            Ok(_) => {}
            Err(e) => {
                warn!(fleet = %fleet.name_any(), error = %e, "Skipping fleet with invalid selector");
            }
        }
    }

    if fleets.is_empty() {
        return Err(FleetError::NotFound(format!(
            "could not find fleets for replica set {} in namespace {} with labels: {:?}",
            rs.name_any(),
            namespace,
            rs_labels
        )));
    }
    Ok(fleets)
}
