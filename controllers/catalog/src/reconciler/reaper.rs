//! Tombstone reaper.
//!
//! The store leaves a tombstone for every deleted resource. The reaper deletes
//! the resources owned by the deleted one in two passes, separated by a delay
//! so children created concurrently with the first pass are caught by the
//! second, and then deletes the tombstone itself.

use crate::error::ControllerError;
use crate::reconcile_helpers::read_if_exists;
use crate::runtime::{Action, ControllerRegistration, Reconciler, Request, Runtime};
use catalog_types::status::{
    FIRST_PASS_COMPLETED_CONDITION, FIRST_PASS_COMPLETED_REASON, REAPER_STATUS_KEY,
};
use chrono::{DateTime, Utc};
use resource_client::{
    Condition, ConditionState, Resource, ResourceId, Status, Tombstone, TOMBSTONE_TYPE,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CONTROLLER_NAME: &str = "reaper";

#[derive(Debug)]
pub struct ReaperReconciler {
    second_pass_delay: Duration,
}

impl ReaperReconciler {
    pub fn new(second_pass_delay: Duration) -> Self {
        Self { second_pass_delay }
    }

    pub fn registration(second_pass_delay: Duration, workers: usize) -> ControllerRegistration {
        ControllerRegistration::new(
            CONTROLLER_NAME,
            TOMBSTONE_TYPE,
            Arc::new(Self::new(second_pass_delay)),
        )
        .with_workers(workers)
    }
}

/// When the first pass completed, if it did and the time was recorded.
fn first_pass_completed_at(tombstone: &Resource) -> Option<DateTime<Utc>> {
    let status = tombstone.status_for(REAPER_STATUS_KEY)?;
    status
        .condition(FIRST_PASS_COMPLETED_CONDITION)
        .filter(|c| c.state == ConditionState::True)?;
    status.updated_at
}

/// Deletes every resource owned by `owner`.
///
/// Keeps going past failures and returns the first one.
async fn delete_children(rt: &Runtime, owner: &ResourceId) -> Result<usize, ControllerError> {
    let children = rt.client.list_by_owner(owner).await?;
    let mut first_error = None;

    for child in &children {
        if let Err(e) = rt.client.delete(&child.id, None).await {
            warn!(owner = %owner, child = %child.id, error = %e, "Failed to delete child");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(children.len()),
    }
}

#[async_trait::async_trait]
impl Reconciler for ReaperReconciler {
    async fn reconcile(&self, rt: &Runtime, req: &Request) -> Result<Action, ControllerError> {
        let Some(resource) = read_if_exists(rt, &req.id).await? else {
            debug!(id = %req.id, "Tombstone already gone");
            return Ok(Action::Done);
        };
        let tombstone: Tombstone = resource.decode()?;

        let Some(completed_at) = first_pass_completed_at(&resource) else {
            let deleted = delete_children(rt, &tombstone.owner).await?;
            info!(owner = %tombstone.owner, deleted, "First reaper pass completed");

            let status = Status::new(
                resource.generation,
                vec![Condition::new(
                    FIRST_PASS_COMPLETED_CONDITION,
                    ConditionState::True,
                    FIRST_PASS_COMPLETED_REASON,
                    "",
                )],
            );
            rt.client
                .write_status(&resource.id, REAPER_STATUS_KEY, status)
                .await?;
            return Ok(Action::RequeueAfter(self.second_pass_delay));
        };

        // A clock step backwards counts as no time elapsed
        let elapsed = (Utc::now() - completed_at).to_std().unwrap_or_default();
        if elapsed < self.second_pass_delay {
            return Ok(Action::RequeueAfter(self.second_pass_delay - elapsed));
        }

        let deleted = delete_children(rt, &tombstone.owner).await?;
        rt.client.delete(&resource.id, None).await?;
        info!(owner = %tombstone.owner, deleted, "Second reaper pass completed, tombstone removed");
        Ok(Action::Done)
    }
}
