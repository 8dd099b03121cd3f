//! In-memory resource store
//!
//! `MemoryResourceClient` implements [`ResourceClientTrait`] over a single
//! mutex-guarded map. It backs the controller binary and every test in the
//! workspace.
//!
//! The store is organized like the operations it serves:
//! - `ops.rs` - read, list, write, status and delete semantics
//! - this module - state, setup helpers, fault injection and event fan-out

mod ops;
#[cfg(test)]
mod memory_test;

use crate::error::ResourceError;
use crate::models::{
    ReferenceKey, Resource, ResourceId, ResourceType, Status, Tenancy, WatchEvent, TOMBSTONE_TYPE,
};
use crate::resource_trait::ResourceClientTrait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the change event channel. Slow subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Store operations that can be made to fail in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    List,
    ListByOwner,
    Write,
    WriteStatus,
    Delete,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) resources: BTreeMap<ReferenceKey, Resource>,
    pub(crate) registered: HashSet<ResourceType>,
    pub(crate) faults: HashMap<Operation, ResourceError>,
    pub(crate) last_version: u64,
}

impl State {
    pub(crate) fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }

    pub(crate) fn ensure_registered(&self, resource_type: &ResourceType) -> Result<(), ResourceError> {
        if self.registered.contains(resource_type) {
            Ok(())
        } else {
            Err(ResourceError::InvalidArgument(format!(
                "resource type {resource_type} is not registered"
            )))
        }
    }

    fn take_fault(&mut self, op: Operation) -> Result<(), ResourceError> {
        match self.faults.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory implementation of the resource store
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct MemoryResourceClient {
    pub(crate) state: Arc<Mutex<State>>,
    events: broadcast::Sender<WatchEvent>,
}

impl MemoryResourceClient {
    /// Creates a store accepting the given resource types.
    ///
    /// The tombstone type is always registered.
    pub fn new(types: impl IntoIterator<Item = ResourceType>) -> Self {
        let mut registered: HashSet<ResourceType> = types.into_iter().collect();
        registered.insert(TOMBSTONE_TYPE);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(State {
                registered,
                ..State::default()
            })),
            events,
        }
    }

    /// Makes the next call of `op` fail with `error` (for test setup)
    pub fn fail_next(&self, op: Operation, error: ResourceError) {
        self.state.lock().faults.insert(op, error);
    }

    /// Writes fixtures unconditionally, in order (for test setup and seeding)
    pub fn seed(&self, resources: Vec<Resource>) -> Result<Vec<Resource>, ResourceError> {
        resources
            .into_iter()
            .map(|mut resource| {
                resource.version = 0;
                let (written, events) = ops::write(&mut self.state.lock(), resource)?;
                self.publish(events);
                Ok(written)
            })
            .collect()
    }

    /// Number of stored resources of a type (for test assertions)
    pub fn count(&self, resource_type: &ResourceType) -> usize {
        self.state
            .lock()
            .resources
            .keys()
            .filter(|k| &k.resource_type == resource_type)
            .count()
    }

    fn publish(&self, events: Vec<WatchEvent>) {
        for event in events {
            if self.events.send(event).is_err() {
                trace!("No watch subscribers; dropping event");
            }
        }
    }

    fn guarded<T>(
        &self,
        op: Operation,
        f: impl FnOnce(&mut State) -> Result<(T, Vec<WatchEvent>), ResourceError>,
    ) -> Result<T, ResourceError> {
        let (value, events) = {
            let mut state = self.state.lock();
            state.take_fault(op)?;
            f(&mut state)?
        };
        self.publish(events);
        Ok(value)
    }
}

#[async_trait::async_trait]
impl ResourceClientTrait for MemoryResourceClient {
    async fn read(&self, id: &ResourceId) -> Result<Resource, ResourceError> {
        self.guarded(Operation::Read, |state| Ok((ops::read(state, id)?, Vec::new())))
    }

    async fn list(
        &self,
        resource_type: &ResourceType,
        tenancy: Option<&Tenancy>,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Resource>, ResourceError> {
        self.guarded(Operation::List, |state| {
            Ok((ops::list(state, resource_type, tenancy, name_prefix)?, Vec::new()))
        })
    }

    async fn list_by_owner(&self, owner: &ResourceId) -> Result<Vec<Resource>, ResourceError> {
        self.guarded(Operation::ListByOwner, |state| {
            Ok((ops::list_by_owner(state, owner), Vec::new()))
        })
    }

    async fn write(&self, resource: Resource) -> Result<Resource, ResourceError> {
        self.guarded(Operation::Write, |state| ops::write(state, resource))
    }

    async fn write_status(
        &self,
        id: &ResourceId,
        key: &str,
        status: Status,
    ) -> Result<Resource, ResourceError> {
        self.guarded(Operation::WriteStatus, |state| {
            ops::write_status(state, id, key, status)
        })
    }

    async fn delete(
        &self,
        id: &ResourceId,
        expected_version: Option<u64>,
    ) -> Result<(), ResourceError> {
        self.guarded(Operation::Delete, |state| {
            Ok(((), ops::delete(state, id, expected_version)?))
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}
