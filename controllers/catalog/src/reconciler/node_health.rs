//! Node health reconciliation.
//!
//! Aggregates the `HealthStatus` resources owned by a node into a single
//! `Healthy` condition under the `node-health` status key.

use crate::error::ControllerError;
use crate::reconcile_helpers::{aggregate_owned_health, read_if_exists, write_status_if_changed};
use crate::runtime::{map_owner_filtered, Action, ControllerRegistration, Reconciler, Request, Runtime};
use catalog_types::status::{
    health_condition, NODE_HEALTHY_MESSAGE, NODE_HEALTH_STATUS_KEY, NODE_UNHEALTHY_MESSAGE,
};
use catalog_types::{HEALTH_STATUS_TYPE, NODE_TYPE};
use resource_client::Status;
use std::sync::Arc;
use tracing::debug;

pub const CONTROLLER_NAME: &str = "node-health";

#[derive(Debug, Default)]
pub struct NodeHealthReconciler;

impl NodeHealthReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Watches nodes, and health checks owned by nodes.
    pub fn registration(workers: usize) -> ControllerRegistration {
        ControllerRegistration::new(CONTROLLER_NAME, NODE_TYPE, Arc::new(Self::new()))
            .with_watch(HEALTH_STATUS_TYPE, map_owner_filtered(NODE_TYPE))
            .with_workers(workers)
    }
}

#[async_trait::async_trait]
impl Reconciler for NodeHealthReconciler {
    async fn reconcile(&self, rt: &Runtime, req: &Request) -> Result<Action, ControllerError> {
        let Some(node) = read_if_exists(rt, &req.id).await? else {
            debug!(id = %req.id, "Node not found, nothing to reconcile");
            return Ok(Action::Done);
        };

        let health = aggregate_owned_health(rt, &node.id).await?;
        let message = if health.is_passing() {
            NODE_HEALTHY_MESSAGE
        } else {
            NODE_UNHEALTHY_MESSAGE
        };
        let status = Status::new(node.generation, vec![health_condition(health, message)]);

        write_status_if_changed(rt, &node, NODE_HEALTH_STATUS_KEY, status).await?;
        Ok(Action::Done)
    }
}
