//! Status contract
//!
//! Status keys, condition types, reasons and messages written by the catalog
//! controllers, and helpers for reading them back. Other components depend on
//! these values, so they must not change.

use crate::error::CatalogTypeError;
use crate::health::Health;
use resource_client::{Condition, ConditionState, Resource};
use std::collections::BTreeSet;

// Status keys (one per controller)
pub const NODE_HEALTH_STATUS_KEY: &str = "node-health";
pub const WORKLOAD_HEALTH_STATUS_KEY: &str = "workload-health";
pub const ENDPOINTS_STATUS_KEY: &str = "endpoint-manager";
pub const REAPER_STATUS_KEY: &str = "reaper";

// Condition types
pub const HEALTHY_CONDITION: &str = "Healthy";
pub const ENDPOINTS_MANAGED_CONDITION: &str = "EndpointsManaged";
pub const BOUND_IDENTITIES_CONDITION: &str = "BoundIdentities";
pub const FIRST_PASS_COMPLETED_CONDITION: &str = "FirstPassCompleted";

/// Metadata marker on generated endpoints, valued with the status key of the
/// controller that generated them.
pub const MANAGED_BY_METADATA_KEY: &str = "managed-by-controller";

// Node health messages
pub const NODE_HEALTHY_MESSAGE: &str = "All node health checks are passing";
pub const NODE_UNHEALTHY_MESSAGE: &str = "One or more node health checks are not passing";

// Workload health messages
pub const WORKLOAD_HEALTHY_MESSAGE: &str = "All workload health checks are passing";
pub const WORKLOAD_UNHEALTHY_MESSAGE: &str = "One or more workload health checks are not passing";
pub const NODE_AND_WORKLOAD_HEALTHY_MESSAGE: &str =
    "All workload and associated node health checks are passing";
pub const NODE_AND_WORKLOAD_UNHEALTHY_MESSAGE: &str =
    "One or more workload and node health checks are not passing";

// Endpoints reasons and messages
pub const SELECTOR_FOUND_REASON: &str = "SelectorFound";
pub const SELECTOR_NOT_FOUND_REASON: &str = "SelectorNotFound";
pub const SELECTOR_FOUND_MESSAGE: &str = "A valid workload selector is present within the service.";
pub const SELECTOR_NOT_FOUND_MESSAGE: &str =
    "Either the workload selector was not present or contained no selection criteria.";
pub const IDENTITIES_FOUND_REASON: &str = "WorkloadIdentitiesFound";
pub const IDENTITIES_NOT_FOUND_REASON: &str = "NoWorkloadIdentitiesFound";
pub const IDENTITIES_NOT_FOUND_MESSAGE: &str =
    "No workload identities were found associated with this service.";

// Reaper
pub const FIRST_PASS_COMPLETED_REASON: &str = "Success";

/// Builds a `Healthy` condition. The reason is the health name.
pub fn health_condition(health: Health, message: &str) -> Condition {
    Condition::new(
        HEALTHY_CONDITION,
        ConditionState::from(health.is_passing()),
        health.as_str(),
        message,
    )
}

/// Reads the health a controller recorded on `resource` under `status_key`.
pub fn recorded_health(resource: &Resource, status_key: &str) -> Result<Health, CatalogTypeError> {
    let status = resource
        .status_for(status_key)
        .ok_or_else(|| CatalogTypeError::StatusMissing(status_key.to_string()))?;
    let condition = status
        .condition(HEALTHY_CONDITION)
        .ok_or_else(|| CatalogTypeError::ConditionMissing(HEALTHY_CONDITION.to_string()))?;
    condition.reason.parse()
}

/// Encodes identities as `a,b,c`: sorted, de-duplicated, empties dropped.
pub fn encode_bound_identities<I, S>(identities: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = identities
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    unique.into_iter().collect::<Vec<_>>().join(",")
}

/// Inverse of [`encode_bound_identities`]. Re-sorts, so messages written out
/// of order by other producers still decode the same. Empty decodes to nothing.
pub fn decode_bound_identities(message: &str) -> Vec<String> {
    let unique: BTreeSet<&str> = message.split(',').filter(|s| !s.is_empty()).collect();
    unique.into_iter().map(ToString::to_string).collect()
}

/// The `BoundIdentities` condition for a service's selected identities.
pub fn bound_identities_condition<S: AsRef<str>>(identities: &[S]) -> Condition {
    let encoded = encode_bound_identities(identities);
    if encoded.is_empty() {
        Condition::new(
            BOUND_IDENTITIES_CONDITION,
            ConditionState::False,
            IDENTITIES_NOT_FOUND_REASON,
            IDENTITIES_NOT_FOUND_MESSAGE,
        )
    } else {
        Condition::new(
            BOUND_IDENTITIES_CONDITION,
            ConditionState::True,
            IDENTITIES_FOUND_REASON,
            encoded,
        )
    }
}

/// Identities recorded on a service by the endpoints controller.
pub fn bound_identities(service: &Resource) -> Vec<String> {
    service
        .status_for(ENDPOINTS_STATUS_KEY)
        .and_then(|s| s.condition(BOUND_IDENTITIES_CONDITION))
        .filter(|c| c.state == ConditionState::True)
        .map(|c| decode_bound_identities(&c.message))
        .unwrap_or_default()
}
