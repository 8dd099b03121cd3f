//! Reverse indexes used to map dependency changes onto reconcile requests.
//!
//! - `node_mapper`: node -> workloads running on it
//! - `selection`: workload name -> endpoints whose service selects it
//!
//! Both are in-memory only and rebuilt as controllers reconcile.

pub mod node_mapper;
pub mod selection;

pub use node_mapper::NodeMapper;
pub use selection::SelectionTracker;

use catalog_types::WorkloadSelector;
use resource_client::ResourceId;

/// Tracks which node each workload is linked to.
pub trait WorkloadNodeTracker: Send + Sync {
    /// Associates `workload` with `node`, replacing any previous association.
    fn track_workload(&self, workload: &ResourceId, node: &ResourceId);

    fn untrack_workload(&self, workload: &ResourceId);

    /// Workloads linked to `node`, sorted.
    fn map_node_to_workloads(&self, node: &ResourceId) -> Vec<ResourceId>;
}

/// Tracks which workloads each target's selector chooses.
pub trait WorkloadSelectionTracker: Send + Sync {
    /// Records `selector` for `target`, replacing any previous selector.
    fn track_id_for_selector(&self, target: &ResourceId, selector: &WorkloadSelector);

    fn untrack_id(&self, target: &ResourceId);

    /// Targets in the workload's tenancy whose selector matches its name, sorted.
    fn map_workload(&self, workload: &ResourceId) -> Vec<ResourceId>;
}
