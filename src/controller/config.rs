//! Runtime knobs for fleet rollouts
//!
//! Configuration from environment variables:
//! - KULTA_FLEET_REVISION_HISTORY_LIMIT_CHARS: character budget of the
//!   revision-history annotation (default: 2000)
//! - KULTA_FLEET_OBSERVED_POLL_INTERVAL_SECS: observed-generation poll interval (default: 1)
//! - KULTA_FLEET_OBSERVED_TIMEOUT_SECS: observed-generation poll timeout (default: 60)

use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const REVISION_HISTORY_LIMIT_ENV: &str = "KULTA_FLEET_REVISION_HISTORY_LIMIT_CHARS";
const POLL_INTERVAL_ENV: &str = "KULTA_FLEET_OBSERVED_POLL_INTERVAL_SECS";
const POLL_TIMEOUT_ENV: &str = "KULTA_FLEET_OBSERVED_TIMEOUT_SECS";

const DEFAULT_REVISION_HISTORY_LIMIT_CHARS: usize = 2000;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FleetConfig {
    /// Passed to `set_new_replica_set_annotations`
    pub revision_history_limit_chars: usize,
    pub observed_poll_interval: Duration,
    pub observed_timeout: Duration,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            revision_history_limit_chars: DEFAULT_REVISION_HISTORY_LIMIT_CHARS,
            observed_poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            observed_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

impl FleetConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take the default, unparsable ones warn and do too
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            revision_history_limit_chars: parse_or(
                &lookup,
                REVISION_HISTORY_LIMIT_ENV,
                DEFAULT_REVISION_HISTORY_LIMIT_CHARS,
            ),
            observed_poll_interval: Duration::from_secs(parse_or(
                &lookup,
                POLL_INTERVAL_ENV,
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            observed_timeout: Duration::from_secs(parse_or(
                &lookup,
                POLL_TIMEOUT_ENV,
                DEFAULT_POLL_TIMEOUT_SECS,
            )),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(e) => {
            warn!(key = key, value = %raw, error = %e, default = %default, "Invalid fleet config value, using default");
            default
        }
    }
}
