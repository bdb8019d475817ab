//! Integration tests for the GuardianGrid mesh service
//!
//! These suites drive the actor through its public handle under a paused
//! tokio clock, so delivery delays elapse deterministically:
//! - Topology formation and link symmetry
//! - Routed delivery, drops and the in-flight window
//! - Broadcast flooding and location updates
//! - Health assessment driven by real traffic
//! - Counter convergence under random churn

pub mod test_utils;

#[cfg(test)]
mod mesh_scenarios;

#[cfg(test)]
mod churn_tests;
