//! Rollout bookkeeping for fleets
//!
//! A fleet owns a set of versioned replica-sets. The submodules hold the
//! pure decision logic a reconciler needs to move a fleet from one template
//! to the next:
//! - `conditions`: the fleet's condition ledger
//! - `annotations`: revision numbers, revision history and replica annotations
//! - `hash`: template fingerprints naming replica-sets
//! - `replicaset`: classifying, counting and ordering replica-sets
//! - `rolling`: surge/unavailable math and proportional scaling
//! - `progress`: completion, progress and deadline evaluation

pub mod annotations;
pub mod conditions;
pub mod error;
pub mod hash;
pub mod listers;
pub mod progress;
pub mod replicaset;
pub mod rolling;
pub mod selector;

pub use annotations::*;
pub use conditions::*;
pub use error::*;
pub use hash::*;
pub use listers::*;
pub use progress::*;
pub use replicaset::*;
pub use rolling::*;
pub use selector::*;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Tests can use unwrap/expect for brevity
#[path = "fleet_test.rs"]
mod tests;
