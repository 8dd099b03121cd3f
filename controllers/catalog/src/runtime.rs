//! Controller runtime contract.
//!
//! A controller is a [`ControllerRegistration`]: the type it reconciles, the
//! dependency types it watches with a mapper for each, and the [`Reconciler`]
//! that converges one resource per [`Request`].

use crate::error::ControllerError;
use resource_client::{Resource, ResourceClientTrait, ResourceId, ResourceType};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identity of the resource to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: ResourceId,
}

impl Request {
    pub fn new(id: ResourceId) -> Self {
        Self { id }
    }
}

/// What the scheduler should do after a successful reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Done,
    RequeueAfter(Duration),
}

/// Handles passed to every reconcile.
#[derive(Clone)]
pub struct Runtime {
    pub client: Arc<dyn ResourceClientTrait>,
}

impl Runtime {
    pub fn new(client: Arc<dyn ResourceClientTrait>) -> Self {
        Self { client }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

/// Converges the derived state of one resource.
///
/// Implementations must be idempotent: re-running with unchanged inputs
/// writes nothing.
#[async_trait::async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, rt: &Runtime, req: &Request) -> Result<Action, ControllerError>;
}

/// Maps a changed dependency to the requests it affects.
pub type MapperFn = Arc<dyn Fn(&Resource) -> Vec<Request> + Send + Sync>;

/// A dependency type and how its changes map onto the watched type.
#[derive(Clone)]
pub struct Watch {
    pub resource_type: ResourceType,
    pub mapper: MapperFn,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("resource_type", &self.resource_type)
            .finish_non_exhaustive()
    }
}

/// Everything needed to run one controller.
pub struct ControllerRegistration {
    pub name: &'static str,
    pub watched_type: ResourceType,
    pub watches: Vec<Watch>,
    pub reconciler: Arc<dyn Reconciler>,
    pub workers: usize,
}

impl ControllerRegistration {
    pub fn new(
        name: &'static str,
        watched_type: ResourceType,
        reconciler: Arc<dyn Reconciler>,
    ) -> Self {
        Self {
            name,
            watched_type,
            watches: Vec::new(),
            reconciler,
            workers: 1,
        }
    }

    #[must_use]
    pub fn with_watch(mut self, resource_type: ResourceType, mapper: MapperFn) -> Self {
        self.watches.push(Watch {
            resource_type,
            mapper,
        });
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

impl fmt::Debug for ControllerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistration")
            .field("name", &self.name)
            .field("watched_type", &self.watched_type)
            .field("watches", &self.watches)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

/// Converts ids into requests.
pub fn requests(ids: impl IntoIterator<Item = ResourceId>) -> Vec<Request> {
    ids.into_iter().map(Request::new).collect()
}

/// Maps a resource to its owner when the owner has `owner_type`.
pub fn map_owner_filtered(owner_type: ResourceType) -> MapperFn {
    Arc::new(move |res: &Resource| {
        res.owner
            .iter()
            .filter(|owner| owner.is_type(&owner_type))
            .map(|owner| Request::new(owner.without_uid()))
            .collect()
    })
}

/// Maps a resource to the same-named resource of `target_type`.
pub fn replace_type(target_type: ResourceType) -> MapperFn {
    Arc::new(move |res: &Resource| vec![Request::new(res.id.replace_type(target_type.clone()))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::{HealthStatus, Health, HEALTH_STATUS_TYPE, NODE_TYPE, SERVICE_ENDPOINTS_TYPE, SERVICE_TYPE, WORKLOAD_TYPE};
    use resource_client::Tenancy;

    fn health_owned_by(owner: ResourceId) -> Resource {
        let id = ResourceId::new(HEALTH_STATUS_TYPE, owner.tenancy.clone(), "check");
        Resource::new(id, &HealthStatus::new("ping", Health::Passing))
            .unwrap()
            .with_owner(owner)
    }

    #[test]
    fn test_map_owner_filtered() {
        let node = ResourceId::new(NODE_TYPE, Tenancy::new("default", ""), "n1");
        let workload = ResourceId::new(WORKLOAD_TYPE, Tenancy::new("default", "default"), "w1");
        let mapper = map_owner_filtered(NODE_TYPE);

        assert_eq!(mapper(&health_owned_by(node.clone())), vec![Request::new(node)]);
        assert!(mapper(&health_owned_by(workload)).is_empty());

        let mut orphan = health_owned_by(ResourceId::new(NODE_TYPE, Tenancy::default(), "x"));
        orphan.owner = None;
        assert!(mapper(&orphan).is_empty());
    }

    #[test]
    fn test_replace_type_drops_uid() {
        let mut service_id = ResourceId::new(SERVICE_TYPE, Tenancy::new("default", "default"), "api");
        service_id.uid = Some("abc".to_string());
        let service = Resource::new(service_id, &serde_json::json!({})).unwrap();

        let mapped = replace_type(SERVICE_ENDPOINTS_TYPE)(&service);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].id.resource_type, SERVICE_ENDPOINTS_TYPE);
        assert_eq!(mapped[0].id.name, "api");
        assert_eq!(mapped[0].id.uid, None);
    }
}
