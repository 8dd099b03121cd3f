//! Workload selector reverse index.
//!
//! Exact names and prefixes are indexed per tenancy. Mapping a workload looks
//! up its exact name and then every prefix of its name, so the cost depends on
//! the name length, not on how many selectors are tracked.

use super::WorkloadSelectionTracker;
use catalog_types::WorkloadSelector;
use parking_lot::RwLock;
use resource_client::{ReferenceKey, ResourceId, Tenancy};
use std::collections::{BTreeSet, HashMap};
use std::iter;

type Targets = BTreeSet<ReferenceKey>;

#[derive(Debug, Default)]
struct SelectionIndex {
    names: HashMap<Tenancy, HashMap<String, Targets>>,
    prefixes: HashMap<Tenancy, HashMap<String, Targets>>,
    /// Selector last tracked for each target, for removal
    selectors: HashMap<ReferenceKey, WorkloadSelector>,
}

fn insert(index: &mut HashMap<Tenancy, HashMap<String, Targets>>, target: &ReferenceKey, value: &str) {
    index
        .entry(target.tenancy.clone())
        .or_default()
        .entry(value.to_string())
        .or_default()
        .insert(target.clone());
}

fn remove(index: &mut HashMap<Tenancy, HashMap<String, Targets>>, target: &ReferenceKey, value: &str) {
    let Some(values) = index.get_mut(&target.tenancy) else {
        return;
    };
    if let Some(targets) = values.get_mut(value) {
        targets.remove(target);
        if targets.is_empty() {
            values.remove(value);
        }
    }
    if values.is_empty() {
        index.remove(&target.tenancy);
    }
}

impl SelectionIndex {
    fn remove_target(&mut self, target: &ReferenceKey) {
        let Some(selector) = self.selectors.remove(target) else {
            return;
        };
        for name in &selector.names {
            remove(&mut self.names, target, name);
        }
        for prefix in &selector.prefixes {
            remove(&mut self.prefixes, target, prefix);
        }
    }
}

/// In-memory [`WorkloadSelectionTracker`].
#[derive(Debug, Default)]
pub struct SelectionTracker {
    index: RwLock<SelectionIndex>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkloadSelectionTracker for SelectionTracker {
    fn track_id_for_selector(&self, target: &ResourceId, selector: &WorkloadSelector) {
        let target = target.key();
        let mut index = self.index.write();
        if index.selectors.get(&target) == Some(selector) {
            return;
        }
        index.remove_target(&target);
        for name in &selector.names {
            insert(&mut index.names, &target, name);
        }
        for prefix in &selector.prefixes {
            insert(&mut index.prefixes, &target, prefix);
        }
        index.selectors.insert(target, selector.clone());
    }

    fn untrack_id(&self, target: &ResourceId) {
        self.index.write().remove_target(&target.key());
    }

    fn map_workload(&self, workload: &ResourceId) -> Vec<ResourceId> {
        let index = self.index.read();
        let name = workload.name.as_str();
        let mut matched = Targets::new();

        if let Some(targets) = index
            .names
            .get(&workload.tenancy)
            .and_then(|names| names.get(name))
        {
            matched.extend(targets.iter().cloned());
        }

        if let Some(prefixes) = index.prefixes.get(&workload.tenancy) {
            let boundaries = name
                .char_indices()
                .map(|(i, _)| i)
                .chain(iter::once(name.len()));
            for end in boundaries {
                if let Some(targets) = prefixes.get(&name[..end]) {
                    matched.extend(targets.iter().cloned());
                }
            }
        }

        matched.iter().map(ReferenceKey::to_id).collect()
    }
}
