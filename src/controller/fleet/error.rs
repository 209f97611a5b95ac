use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Failed to parse {field} {value:?}: {reason}")]
    ParseError {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Fleet strategy type {0:?} isn't supported")]
    UnsupportedStrategy(String),

    #[error("Invalid label selector: {0}")]
    SelectorError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out after {timeout:?} waiting for observed generation {desired_generation}")]
    Timeout {
        desired_generation: i64,
        timeout: Duration,
    },

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to serialize cluster template: {0}")]
    SerializationError(String),
}

impl FleetError {
    pub(crate) fn parse(field: &'static str, value: &str, reason: impl ToString) -> Self {
        FleetError::ParseError {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
