//! Service Catalog Types
//!
//! Payload types stored in the resource store by the catalog, the shared
//! health model, and the status contract other consumers read.

pub mod endpoints;
pub mod error;
pub mod health;
pub mod node;
pub mod service;
pub mod status;
pub mod workload;

pub use endpoints::*;
pub use error::CatalogTypeError;
pub use health::*;
pub use node::*;
pub use service::*;
pub use workload::*;

use resource_client::ResourceType;

/// API group shared by every catalog type.
pub const CATALOG_GROUP: &str = "catalog";
/// Version of the catalog API group.
pub const CATALOG_VERSION: &str = "v2beta1";

pub const NODE_TYPE: ResourceType = ResourceType::new_static(CATALOG_GROUP, CATALOG_VERSION, "Node");
pub const HEALTH_STATUS_TYPE: ResourceType =
    ResourceType::new_static(CATALOG_GROUP, CATALOG_VERSION, "HealthStatus");
pub const WORKLOAD_TYPE: ResourceType =
    ResourceType::new_static(CATALOG_GROUP, CATALOG_VERSION, "Workload");
pub const SERVICE_TYPE: ResourceType =
    ResourceType::new_static(CATALOG_GROUP, CATALOG_VERSION, "Service");
pub const SERVICE_ENDPOINTS_TYPE: ResourceType =
    ResourceType::new_static(CATALOG_GROUP, CATALOG_VERSION, "ServiceEndpoints");

/// Every catalog type, for registering with a store.
pub fn registered_types() -> Vec<ResourceType> {
    vec![
        NODE_TYPE,
        HEALTH_STATUS_TYPE,
        WORKLOAD_TYPE,
        SERVICE_TYPE,
        SERVICE_ENDPOINTS_TYPE,
    ]
}

/// Looks up a catalog type by its kind name (e.g. `"Workload"`).
pub fn resource_type_for_kind(kind: &str) -> Option<ResourceType> {
    registered_types().into_iter().find(|t| t.kind == kind)
}
