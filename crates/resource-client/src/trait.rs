//! ResourceClient trait for mocking
//!
//! Controllers talk to the store only through this trait, so tests can swap in
//! the in-memory store.

use crate::error::ResourceError;
use crate::models::{Resource, ResourceId, ResourceType, Status, Tenancy, WatchEvent};
use tokio::sync::broadcast;

/// Trait for resource store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Dropping a returned future cancels the call.
#[async_trait::async_trait]
pub trait ResourceClientTrait: Send + Sync {
    /// Reads a resource. An id carrying a uid only matches that incarnation.
    async fn read(&self, id: &ResourceId) -> Result<Resource, ResourceError>;

    /// Lists resources of a type, sorted by key.
    ///
    /// `tenancy = None` lists every tenancy; `name_prefix = Some("")` matches all names.
    async fn list(
        &self,
        resource_type: &ResourceType,
        tenancy: Option<&Tenancy>,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Resource>, ResourceError>;

    /// Lists resources whose owner is `owner`.
    async fn list_by_owner(&self, owner: &ResourceId) -> Result<Vec<Resource>, ResourceError>;

    /// Creates or updates a resource.
    ///
    /// `resource.version == 0` writes unconditionally, any other value must
    /// match the stored version. Status is never modified by this call.
    async fn write(&self, resource: Resource) -> Result<Resource, ResourceError>;

    /// Replaces the status entry under `key`.
    async fn write_status(
        &self,
        id: &ResourceId,
        key: &str,
        status: Status,
    ) -> Result<Resource, ResourceError>;

    /// Deletes a resource. Deleting a missing resource succeeds.
    ///
    /// With `expected_version` set, the delete only happens if the stored
    /// version still matches.
    async fn delete(
        &self,
        id: &ResourceId,
        expected_version: Option<u64>,
    ) -> Result<(), ResourceError>;

    /// Subscribes to change events for every resource.
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent>;
}
