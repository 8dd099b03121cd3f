//! Reconciliation logic for the catalog.
//!
//! - `node_health`: node `Healthy` condition from its checks
//! - `workload_health`: workload `Healthy` condition from its checks and its node
//! - `endpoints`: generated `ServiceEndpoints` for services with a selector
//! - `reaper`: cleanup of resources owned by deleted resources

pub mod endpoints;
pub mod node_health;
pub mod reaper;
pub mod workload_health;

#[cfg(test)]
mod node_health_test;

pub use endpoints::EndpointsReconciler;
pub use node_health::NodeHealthReconciler;
pub use reaper::ReaperReconciler;
pub use workload_health::WorkloadHealthReconciler;

use crate::config::ControllerConfig;
use crate::runtime::ControllerRegistration;
use crate::tracker::{NodeMapper, SelectionTracker};
use std::sync::Arc;

/// Every catalog controller, with one tracker instance each for the process.
pub fn registrations(config: &ControllerConfig) -> Vec<ControllerRegistration> {
    let node_mapper = Arc::new(NodeMapper::new());
    let selection_tracker = Arc::new(SelectionTracker::new());

    vec![
        NodeHealthReconciler::registration(config.workers),
        WorkloadHealthReconciler::registration(node_mapper, config.workers),
        EndpointsReconciler::registration(selection_tracker, config.workers),
        ReaperReconciler::registration(config.reaper_second_pass_delay, config.workers),
    ]
}
