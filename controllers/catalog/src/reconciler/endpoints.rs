//! Service endpoints reconciliation.
//!
//! For every service with a non-empty workload selector, generates a
//! `ServiceEndpoints` resource with the same tenancy and name, owned by the
//! service and marked with `managed-by-controller: endpoint-manager`. The
//! service's `endpoint-manager` status records whether endpoints are managed
//! and which workload identities back them.
//!
//! Generated endpoints are deleted once the service stops selecting
//! workloads. Endpoints without the marker are left alone.

use crate::error::ControllerError;
use crate::reconcile_helpers::{read_if_exists, write_status_if_changed};
use crate::runtime::{
    replace_type, requests, Action, ControllerRegistration, MapperFn, Reconciler, Request, Runtime,
};
use crate::tracker::WorkloadSelectionTracker;
use catalog_types::status::{
    bound_identities_condition, recorded_health, ENDPOINTS_MANAGED_CONDITION, ENDPOINTS_STATUS_KEY,
    MANAGED_BY_METADATA_KEY, SELECTOR_FOUND_MESSAGE, SELECTOR_FOUND_REASON,
    SELECTOR_NOT_FOUND_MESSAGE, SELECTOR_NOT_FOUND_REASON, WORKLOAD_HEALTH_STATUS_KEY,
};
use catalog_types::{
    Endpoint, Health, Protocol, Service, ServiceEndpoints, Workload, WorkloadAddress,
    WorkloadSelector, SERVICE_ENDPOINTS_TYPE, SERVICE_TYPE, WORKLOAD_TYPE,
};
use resource_client::{Condition, ConditionState, Resource, ResourceId, Status};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CONTROLLER_NAME: &str = "endpoint-manager";

pub struct EndpointsReconciler {
    tracker: Arc<dyn WorkloadSelectionTracker>,
}

impl std::fmt::Debug for EndpointsReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointsReconciler").finish_non_exhaustive()
    }
}

impl EndpointsReconciler {
    pub fn new(tracker: Arc<dyn WorkloadSelectionTracker>) -> Self {
        Self { tracker }
    }

    /// Watches endpoints, their name-aligned services, and selected workloads.
    pub fn registration(
        tracker: Arc<dyn WorkloadSelectionTracker>,
        workers: usize,
    ) -> ControllerRegistration {
        ControllerRegistration::new(
            CONTROLLER_NAME,
            SERVICE_ENDPOINTS_TYPE,
            Arc::new(Self::new(tracker.clone())),
        )
        .with_watch(SERVICE_TYPE, replace_type(SERVICE_ENDPOINTS_TYPE))
        .with_watch(WORKLOAD_TYPE, map_workload_to_endpoints(tracker))
        .with_workers(workers)
    }

    async fn reconcile_managed(
        &self,
        rt: &Runtime,
        service_res: &Resource,
        service: &Service,
        selector: &WorkloadSelector,
        endpoints_id: &ResourceId,
        existing: Option<&Resource>,
    ) -> Result<Vec<Condition>, ControllerError> {
        // Track before listing so workloads created meanwhile still map here
        self.tracker.track_id_for_selector(endpoints_id, selector);

        let workloads = gather_workloads(rt, service_res, selector).await?;
        let mut endpoints = Vec::with_capacity(workloads.len());
        for workload_res in &workloads {
            let workload: Workload = workload_res.decode()?;
            let health = recorded_health(workload_res, WORKLOAD_HEALTH_STATUS_KEY)
                .unwrap_or(Health::Critical);
            if let Some(endpoint) = workload_to_endpoint(service, &workload_res.id, &workload, health) {
                endpoints.push(endpoint);
            }
        }

        let identities: Vec<&str> = endpoints.iter().map(|e| e.identity.as_str()).collect();
        let identities_condition = bound_identities_condition(&identities);

        let desired = ServiceEndpoints { endpoints };
        if endpoints_up_to_date(existing, &service_res.id, &desired) {
            debug!(id = %endpoints_id, "Endpoints unchanged");
        } else {
            let mut resource = Resource::new(endpoints_id.clone(), &desired)?
                .with_owner(service_res.id.clone())
                .with_metadata(MANAGED_BY_METADATA_KEY, ENDPOINTS_STATUS_KEY);
            resource.version = existing.map_or(0, |e| e.version);
            rt.client.write(resource).await?;
            info!(
                id = %endpoints_id,
                endpoints = desired.endpoints.len(),
                "Wrote service endpoints"
            );
        }

        Ok(vec![
            Condition::new(
                ENDPOINTS_MANAGED_CONDITION,
                ConditionState::True,
                SELECTOR_FOUND_REASON,
                SELECTOR_FOUND_MESSAGE,
            ),
            identities_condition,
        ])
    }

    async fn reconcile_unmanaged(
        &self,
        rt: &Runtime,
        endpoints_id: &ResourceId,
        existing: Option<&Resource>,
    ) -> Result<Vec<Condition>, ControllerError> {
        self.tracker.untrack_id(endpoints_id);

        if let Some(existing) = existing.filter(|e| is_generated(e)) {
            match rt.client.delete(&existing.id, Some(existing.version)).await {
                Ok(()) => info!(id = %existing.id, "Deleted generated endpoints"),
                Err(e) if e.is_conflict() => {
                    warn!(id = %existing.id, error = %e, "Endpoints changed concurrently, skipping delete");
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(vec![Condition::new(
            ENDPOINTS_MANAGED_CONDITION,
            ConditionState::False,
            SELECTOR_NOT_FOUND_REASON,
            SELECTOR_NOT_FOUND_MESSAGE,
        )])
    }
}

#[async_trait::async_trait]
impl Reconciler for EndpointsReconciler {
    async fn reconcile(&self, rt: &Runtime, req: &Request) -> Result<Action, ControllerError> {
        let endpoints_id = req.id.without_uid();
        let service_id = endpoints_id.replace_type(SERVICE_TYPE);

        let Some(service_res) = read_if_exists(rt, &service_id).await? else {
            debug!(id = %service_id, "Service not found, untracking endpoints");
            self.tracker.untrack_id(&endpoints_id);
            return Ok(Action::Done);
        };
        let service: Service = service_res.decode()?;
        let existing = read_if_exists(rt, &endpoints_id).await?;

        let conditions = match service.workloads.as_ref() {
            Some(selector) if service.is_managed() => {
                self.reconcile_managed(
                    rt,
                    &service_res,
                    &service,
                    selector,
                    &endpoints_id,
                    existing.as_ref(),
                )
                .await?
            }
            _ => {
                self.reconcile_unmanaged(rt, &endpoints_id, existing.as_ref())
                    .await?
            }
        };

        let status = Status::new(service_res.generation, conditions);
        write_status_if_changed(rt, &service_res, ENDPOINTS_STATUS_KEY, status).await?;
        Ok(Action::Done)
    }
}

/// Maps a workload change to the endpoints whose selector matches it.
pub fn map_workload_to_endpoints(tracker: Arc<dyn WorkloadSelectionTracker>) -> MapperFn {
    Arc::new(move |workload: &Resource| requests(tracker.map_workload(&workload.id)))
}

fn is_generated(endpoints: &Resource) -> bool {
    endpoints.metadata.get(MANAGED_BY_METADATA_KEY).map(String::as_str) == Some(ENDPOINTS_STATUS_KEY)
}

fn endpoints_up_to_date(
    existing: Option<&Resource>,
    owner: &ResourceId,
    desired: &ServiceEndpoints,
) -> bool {
    let Some(existing) = existing else {
        return false;
    };
    existing.owner.as_ref() == Some(owner)
        && is_generated(existing)
        && existing
            .decode::<ServiceEndpoints>()
            .is_ok_and(|current| &current == desired)
}

/// Workloads selected by name or prefix in the service's tenancy, sorted by
/// name with duplicates removed.
async fn gather_workloads(
    rt: &Runtime,
    service_res: &Resource,
    selector: &WorkloadSelector,
) -> Result<Vec<Resource>, ControllerError> {
    let tenancy = &service_res.id.tenancy;
    let mut selected: BTreeMap<String, Resource> = BTreeMap::new();

    for prefix in &selector.prefixes {
        for workload in rt
            .client
            .list(&WORKLOAD_TYPE, Some(tenancy), Some(prefix))
            .await?
        {
            selected.insert(workload.id.name.clone(), workload);
        }
    }

    for name in &selector.names {
        if selected.contains_key(name) {
            continue;
        }
        let id = ResourceId::new(WORKLOAD_TYPE, tenancy.clone(), name.clone());
        if let Some(workload) = read_if_exists(rt, &id).await? {
            selected.insert(name.clone(), workload);
        }
    }

    Ok(selected.into_values().collect())
}

/// Builds the endpoint for one workload as seen through the service's ports.
///
/// Only ports targeted by the service survive, and only when the protocols
/// agree; a workload port without a protocol takes the service's. Addresses
/// keep the surviving ports they list (all of them when they list none) and
/// are dropped when none remain. A workload without any address left has no
/// endpoint.
pub fn workload_to_endpoint(
    service: &Service,
    workload_id: &ResourceId,
    workload: &Workload,
    health: Health,
) -> Option<Endpoint> {
    let mut ports = BTreeMap::new();
    for service_port in &service.ports {
        let Some(workload_port) = workload.ports.get(&service_port.target_port) else {
            continue;
        };
        if ports.contains_key(&service_port.target_port) {
            continue;
        }
        let mut port = *workload_port;
        if port.protocol == Protocol::Unspecified {
            port.protocol = service_port.protocol;
        } else if port.protocol != service_port.protocol {
            debug!(
                workload = %workload_id,
                port = %service_port.target_port,
                workload_protocol = ?workload_port.protocol,
                service_protocol = ?service_port.protocol,
                "Dropping port with mismatched protocol"
            );
            continue;
        }
        ports.insert(service_port.target_port.clone(), port);
    }

    let addresses: Vec<WorkloadAddress> = workload
        .addresses
        .iter()
        .filter_map(|address| {
            let names: BTreeSet<&String> = if address.ports.is_empty() {
                ports.keys().collect()
            } else {
                address
                    .ports
                    .iter()
                    .filter(|name| ports.contains_key(*name))
                    .collect()
            };
            if names.is_empty() {
                return None;
            }
            Some(WorkloadAddress {
                host: address.host.clone(),
                ports: names.into_iter().cloned().collect(),
                external: address.external,
            })
        })
        .collect();

    if addresses.is_empty() {
        return None;
    }

    Some(Endpoint {
        target_ref: Some(workload_id.clone()),
        addresses,
        ports,
        health_status: health,
        identity: workload.identity.clone(),
        dns: workload.dns,
    })
}
