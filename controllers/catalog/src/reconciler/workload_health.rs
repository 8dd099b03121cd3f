//! Workload health reconciliation.
//!
//! A workload's health is the worst of its own checks and, when it names a
//! node, that node's recorded health. The result is written as a `Healthy`
//! condition under the `workload-health` status key.

use crate::error::ControllerError;
use crate::reconcile_helpers::{aggregate_owned_health, read_if_exists, write_status_if_changed};
use crate::runtime::{
    map_owner_filtered, requests, Action, ControllerRegistration, MapperFn, Reconciler, Request,
    Runtime,
};
use crate::tracker::WorkloadNodeTracker;
use catalog_types::status::{
    health_condition, recorded_health, NODE_AND_WORKLOAD_HEALTHY_MESSAGE,
    NODE_AND_WORKLOAD_UNHEALTHY_MESSAGE, NODE_HEALTH_STATUS_KEY, NODE_UNHEALTHY_MESSAGE,
    WORKLOAD_HEALTHY_MESSAGE, WORKLOAD_HEALTH_STATUS_KEY, WORKLOAD_UNHEALTHY_MESSAGE,
};
use catalog_types::{CatalogTypeError, Health, Workload, HEALTH_STATUS_TYPE, NODE_TYPE, WORKLOAD_TYPE};
use resource_client::{Condition, Resource, ResourceId, Status};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

pub const CONTROLLER_NAME: &str = "workload-health";

/// Conditions for workloads without a node, indexed by workload health.
static WORKLOAD_CONDITIONS: LazyLock<[Condition; 4]> = LazyLock::new(|| {
    Health::ALL.map(|own| {
        let message = if own.is_passing() {
            WORKLOAD_HEALTHY_MESSAGE
        } else {
            WORKLOAD_UNHEALTHY_MESSAGE
        };
        health_condition(own, message)
    })
});

/// Conditions for node-linked workloads, indexed by `[workload][node]`.
static NODE_AND_WORKLOAD_CONDITIONS: LazyLock<[[Condition; 4]; 4]> = LazyLock::new(|| {
    Health::ALL.map(|own| {
        Health::ALL.map(|node| {
            let message = match (own.is_passing(), node.is_passing()) {
                (true, true) => NODE_AND_WORKLOAD_HEALTHY_MESSAGE,
                (true, false) => NODE_UNHEALTHY_MESSAGE,
                (false, true) => WORKLOAD_UNHEALTHY_MESSAGE,
                (false, false) => NODE_AND_WORKLOAD_UNHEALTHY_MESSAGE,
            };
            health_condition(own.max(node), message)
        })
    })
});

/// The `Healthy` condition for a workload's own health and its node's, if any.
pub fn workload_condition(own: Health, node: Option<Health>) -> &'static Condition {
    match node {
        Some(node) => &NODE_AND_WORKLOAD_CONDITIONS[own as usize][node as usize],
        None => &WORKLOAD_CONDITIONS[own as usize],
    }
}

pub struct WorkloadHealthReconciler {
    tracker: Arc<dyn WorkloadNodeTracker>,
}

impl WorkloadHealthReconciler {
    pub fn new(tracker: Arc<dyn WorkloadNodeTracker>) -> Self {
        Self { tracker }
    }

    /// Watches workloads, checks owned by workloads, and nodes via the tracker.
    pub fn registration(tracker: Arc<dyn WorkloadNodeTracker>, workers: usize) -> ControllerRegistration {
        ControllerRegistration::new(
            CONTROLLER_NAME,
            WORKLOAD_TYPE,
            Arc::new(Self::new(tracker.clone())),
        )
        .with_watch(HEALTH_STATUS_TYPE, map_owner_filtered(WORKLOAD_TYPE))
        .with_watch(NODE_TYPE, map_node_to_workloads(tracker))
        .with_workers(workers)
    }
}

/// Maps a node change to the workloads tracked on it.
pub fn map_node_to_workloads(tracker: Arc<dyn WorkloadNodeTracker>) -> MapperFn {
    Arc::new(move |node: &Resource| requests(tracker.map_node_to_workloads(&node.id)))
}

/// Health recorded on the node by the node health controller.
///
/// A missing node is `Critical` without error. A node that exists but has no
/// usable health yet is an error, so the workload is retried instead of
/// recording a guess.
pub async fn get_node_health(rt: &Runtime, node_id: &ResourceId) -> Result<Health, ControllerError> {
    let Some(node) = read_if_exists(rt, node_id).await? else {
        debug!(node = %node_id, "Linked node not found, treating as critical");
        return Ok(Health::Critical);
    };

    recorded_health(&node, NODE_HEALTH_STATUS_KEY).map_err(|e| {
        let node = node_id.to_string();
        match e {
            CatalogTypeError::StatusMissing(_) => ControllerError::NodeUnreconciled(node),
            CatalogTypeError::ConditionMissing(_) => ControllerError::NodeHealthConditionNotFound(node),
            CatalogTypeError::InvalidHealth(_) => ControllerError::NodeHealthInvalid(node),
        }
    })
}

impl std::fmt::Debug for WorkloadHealthReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadHealthReconciler").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Reconciler for WorkloadHealthReconciler {
    async fn reconcile(&self, rt: &Runtime, req: &Request) -> Result<Action, ControllerError> {
        let Some(resource) = read_if_exists(rt, &req.id).await? else {
            debug!(id = %req.id, "Workload not found, untracking");
            self.tracker.untrack_workload(&req.id);
            return Ok(Action::Done);
        };
        let workload: Workload = resource.decode()?;

        let node_health = match workload.node_name() {
            Some(node_name) => {
                let node_id = ResourceId::new(
                    NODE_TYPE,
                    resource.id.tenancy.partition_scoped(),
                    node_name,
                );
                // Track before reading so a node change racing this read still maps here
                self.tracker.track_workload(&resource.id, &node_id);
                match get_node_health(rt, &node_id).await {
                    Ok(health) => Some(health),
                    Err(e) => {
                        warn!(id = %resource.id, node = %node_id, error = %e, "Node health unavailable");
                        return Err(e);
                    }
                }
            }
            None => {
                self.tracker.untrack_workload(&resource.id);
                None
            }
        };

        let own_health = aggregate_owned_health(rt, &resource.id).await?;
        let condition = workload_condition(own_health, node_health).clone();
        let status = Status::new(resource.generation, vec![condition]);

        write_status_if_changed(rt, &resource, WORKLOAD_HEALTH_STATUS_KEY, status).await?;
        Ok(Action::Done)
    }
}
