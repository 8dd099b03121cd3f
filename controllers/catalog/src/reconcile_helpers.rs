//! Helper functions for common reconciliation patterns
//!
//! Reads that treat not-found as absence, owned health aggregation, and
//! status writes that skip no-op updates.

use crate::error::ControllerError;
use crate::runtime::Runtime;
use catalog_types::{HEALTH_STATUS_TYPE, Health, HealthStatus};
use resource_client::{Resource, ResourceId, Status};
use tracing::{debug, info};

/// Reads `id`, returning `None` when it does not exist.
pub async fn read_if_exists(
    rt: &Runtime,
    id: &ResourceId,
) -> Result<Option<Resource>, ControllerError> {
    match rt.client.read(id).await {
        Ok(resource) => Ok(Some(resource)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Aggregated health of the `HealthStatus` resources owned by `owner`.
///
/// No checks means `Passing`.
pub async fn aggregate_owned_health(
    rt: &Runtime,
    owner: &ResourceId,
) -> Result<Health, ControllerError> {
    let children = rt.client.list_by_owner(owner).await?;

    let mut statuses = Vec::new();
    for child in children
        .iter()
        .filter(|c| c.id.is_type(&HEALTH_STATUS_TYPE))
    {
        let status: HealthStatus = child.decode()?;
        statuses.push(status.status);
    }

    Ok(Health::aggregate(statuses))
}

/// Writes `status` under `key` unless an equivalent status is already there.
///
/// Returns whether a write happened.
pub async fn write_status_if_changed(
    rt: &Runtime,
    resource: &Resource,
    key: &str,
    status: Status,
) -> Result<bool, ControllerError> {
    if resource
        .status_for(key)
        .is_some_and(|existing| existing.equivalent(&status))
    {
        debug!(id = %resource.id, key, "Status unchanged, skipping write");
        return Ok(false);
    }

    rt.client.write_status(&resource.id, key, status).await?;
    info!(id = %resource.id, key, "Updated status");
    Ok(true)
}

#[cfg(test)]
#[path = "reconcile_helpers_test.rs"]
mod reconcile_helpers_test;
