//! Label selector helpers on top of `kube::core::Selector`

use super::error::FleetError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::{Selector, SelectorExt};
use std::collections::BTreeMap;

/// Parse a LabelSelector, rejecting unknown operators and missing values
///
/// # Errors
/// SelectorError if any expression is invalid
pub fn to_selector(selector: &LabelSelector) -> Result<Selector, FleetError> {
    Selector::try_from(selector.clone()).map_err(|e| FleetError::SelectorError(e.to_string()))
}

/// Render a LabelSelector in list-option syntax (`app=x,tier in (a,b),!legacy`)
///
/// # Errors
/// SelectorError for unknown operators or In/NotIn without values
pub fn label_selector_to_string(selector: &LabelSelector) -> Result<String, FleetError> {
    Ok(to_selector(selector)?.to_string())
}

/// True if the selector has no requirements at all (and so matches everything)
pub fn selector_is_empty(selector: &LabelSelector) -> bool {
    to_selector(selector).is_ok_and(|s| s.selects_all())
}

/// Whether `labels` satisfy every requirement of the selector
///
/// # Errors
/// SelectorError if the selector is invalid
pub fn selector_matches(
    selector: &LabelSelector,
    labels: &BTreeMap<String, String>,
) -> Result<bool, FleetError> {
    Ok(to_selector(selector)?.matches(labels))
}
