//! Node -> workload reverse index.

use super::WorkloadNodeTracker;
use parking_lot::RwLock;
use resource_client::{ReferenceKey, ResourceId};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
struct NodeIndex {
    workload_to_node: HashMap<ReferenceKey, ReferenceKey>,
    node_to_workloads: HashMap<ReferenceKey, BTreeSet<ReferenceKey>>,
}

impl NodeIndex {
    fn remove(&mut self, workload: &ReferenceKey) {
        let Some(node) = self.workload_to_node.remove(workload) else {
            return;
        };
        if let Some(workloads) = self.node_to_workloads.get_mut(&node) {
            workloads.remove(workload);
            if workloads.is_empty() {
                self.node_to_workloads.remove(&node);
            }
        }
    }
}

/// In-memory [`WorkloadNodeTracker`].
#[derive(Debug, Default)]
pub struct NodeMapper {
    index: RwLock<NodeIndex>,
}

impl NodeMapper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkloadNodeTracker for NodeMapper {
    fn track_workload(&self, workload: &ResourceId, node: &ResourceId) {
        let workload = workload.key();
        let node = node.key();
        let mut index = self.index.write();
        if index.workload_to_node.get(&workload) == Some(&node) {
            return;
        }
        index.remove(&workload);
        index
            .node_to_workloads
            .entry(node.clone())
            .or_default()
            .insert(workload.clone());
        index.workload_to_node.insert(workload, node);
    }

    fn untrack_workload(&self, workload: &ResourceId) {
        self.index.write().remove(&workload.key());
    }

    fn map_node_to_workloads(&self, node: &ResourceId) -> Vec<ResourceId> {
        self.index
            .read()
            .node_to_workloads
            .get(&node.key())
            .map(|workloads| workloads.iter().map(ReferenceKey::to_id).collect())
            .unwrap_or_default()
    }
}
