//! Store operations for MemoryResourceClient
//!
//! Each function runs under the store lock and returns the events to publish
//! once the lock is released.

use super::State;
use crate::error::ResourceError;
use crate::models::{
    Resource, ResourceId, ResourceType, Status, Tenancy, Tombstone, WatchEvent, TOMBSTONE_TYPE,
};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

fn not_found(id: &ResourceId) -> ResourceError {
    ResourceError::NotFound(id.to_string())
}

fn uid_matches(requested: Option<&String>, stored: Option<&String>) -> bool {
    match (requested, stored) {
        (Some(requested), Some(stored)) => requested == stored,
        _ => true,
    }
}

pub(super) fn read(state: &State, id: &ResourceId) -> Result<Resource, ResourceError> {
    state.ensure_registered(&id.resource_type)?;
    state
        .resources
        .get(&id.key())
        .filter(|r| uid_matches(id.uid.as_ref(), r.id.uid.as_ref()))
        .cloned()
        .ok_or_else(|| not_found(id))
}

pub(super) fn list(
    state: &State,
    resource_type: &ResourceType,
    tenancy: Option<&Tenancy>,
    name_prefix: Option<&str>,
) -> Result<Vec<Resource>, ResourceError> {
    state.ensure_registered(resource_type)?;
    Ok(state
        .resources
        .iter()
        .filter(|(key, _)| &key.resource_type == resource_type)
        .filter(|(key, _)| tenancy.is_none_or(|t| &key.tenancy == t))
        .filter(|(key, _)| name_prefix.is_none_or(|p| key.name.starts_with(p)))
        .map(|(_, r)| r.clone())
        .collect())
}

pub(super) fn list_by_owner(state: &State, owner: &ResourceId) -> Vec<Resource> {
    let owner_key = owner.key();
    state
        .resources
        .values()
        .filter(|r| {
            r.owner.as_ref().is_some_and(|o| {
                o.key() == owner_key && uid_matches(owner.uid.as_ref(), o.uid.as_ref())
            })
        })
        .cloned()
        .collect()
}

pub(super) fn write(
    state: &mut State,
    mut resource: Resource,
) -> Result<(Resource, Vec<WatchEvent>), ResourceError> {
    state.ensure_registered(&resource.id.resource_type)?;
    let key = resource.id.key();

    match state.resources.get(&key) {
        Some(existing) => {
            if resource.version != 0 && resource.version != existing.version {
                return Err(ResourceError::VersionConflict {
                    id: resource.id.to_string(),
                    expected: resource.version,
                    actual: existing.version,
                });
            }
            if !uid_matches(resource.id.uid.as_ref(), existing.id.uid.as_ref()) {
                return Err(ResourceError::VersionConflict {
                    id: resource.id.to_string(),
                    expected: resource.version,
                    actual: existing.version,
                });
            }
            resource.id.uid.clone_from(&existing.id.uid);
            resource.generation = if existing.data == resource.data {
                existing.generation
            } else {
                existing.generation + 1
            };
            resource.status = existing.status.clone();
        }
        None => {
            if resource.version != 0 {
                return Err(ResourceError::VersionConflict {
                    id: resource.id.to_string(),
                    expected: resource.version,
                    actual: 0,
                });
            }
            resource.id.uid = Some(Uuid::new_v4().to_string());
            resource.generation = 1;
            resource.status.clear();
        }
    }

    resource.version = state.next_version();
    debug!(id = %resource.id, version = resource.version, generation = resource.generation, "Wrote resource");
    state.resources.insert(key, resource.clone());
    Ok((resource.clone(), vec![WatchEvent::Upsert(resource)]))
}

pub(super) fn write_status(
    state: &mut State,
    id: &ResourceId,
    key: &str,
    mut status: Status,
) -> Result<(Resource, Vec<WatchEvent>), ResourceError> {
    state.ensure_registered(&id.resource_type)?;
    let version = state.next_version();
    let resource = state
        .resources
        .get_mut(&id.key())
        .filter(|r| uid_matches(id.uid.as_ref(), r.id.uid.as_ref()))
        .ok_or_else(|| not_found(id))?;

    status.updated_at = Some(Utc::now());
    resource.status.insert(key.to_string(), status);
    resource.version = version;
    let updated = resource.clone();
    Ok((updated.clone(), vec![WatchEvent::Upsert(updated)]))
}

pub(super) fn delete(
    state: &mut State,
    id: &ResourceId,
    expected_version: Option<u64>,
) -> Result<Vec<WatchEvent>, ResourceError> {
    state.ensure_registered(&id.resource_type)?;
    let key = id.key();

    let Some(existing) = state
        .resources
        .get(&key)
        .filter(|r| uid_matches(id.uid.as_ref(), r.id.uid.as_ref()))
    else {
        return Ok(Vec::new());
    };

    match expected_version {
        Some(expected) if expected != existing.version => {
            return Err(ResourceError::VersionConflict {
                id: id.to_string(),
                expected,
                actual: existing.version,
            });
        }
        _ => {}
    }

    let Some(removed) = state.resources.remove(&key) else {
        return Ok(Vec::new());
    };
    debug!(id = %removed.id, "Deleted resource");
    let mut events = vec![WatchEvent::Delete(removed.clone())];

    if !removed.id.is_type(&TOMBSTONE_TYPE) {
        let tombstone_id = ResourceId::new(
            TOMBSTONE_TYPE,
            removed.id.tenancy.clone(),
            format!("tombstone-{}", Uuid::new_v4()),
        );
        let tombstone = Resource::new(
            tombstone_id,
            &Tombstone {
                owner: removed.id.clone(),
            },
        )?;
        let (_, tombstone_events) = write(state, tombstone)?;
        events.extend(tombstone_events);
    }

    Ok(events)
}
