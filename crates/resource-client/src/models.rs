//! Resource store models
//!
//! Every object in the catalog is a [`Resource`]: a typed, versioned envelope
//! around an opaque JSON payload, plus per-controller status entries.

use crate::error::ResourceError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Type of a resource: `(group, group_version, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub group: Cow<'static, str>,
    pub group_version: Cow<'static, str>,
    pub kind: Cow<'static, str>,
}

impl ResourceType {
    /// Builds a type from static strings, usable in `const` items.
    pub const fn new_static(
        group: &'static str,
        group_version: &'static str,
        kind: &'static str,
    ) -> Self {
        Self {
            group: Cow::Borrowed(group),
            group_version: Cow::Borrowed(group_version),
            kind: Cow::Borrowed(kind),
        }
    }

    pub fn new(
        group: impl Into<String>,
        group_version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: Cow::Owned(group.into()),
            group_version: Cow::Owned(group_version.into()),
            kind: Cow::Owned(kind.into()),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.group, self.group_version, self.kind)
    }
}

/// Opaque partition key for a resource.
///
/// Partition-scoped types (such as nodes) leave `namespace` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tenancy {
    #[serde(default)]
    pub partition: String,
    #[serde(default)]
    pub namespace: String,
}

impl Tenancy {
    pub fn new(partition: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            namespace: namespace.into(),
        }
    }

    /// The same partition with the namespace cleared.
    pub fn partition_scoped(&self) -> Self {
        Self {
            partition: self.partition.clone(),
            namespace: String::new(),
        }
    }
}

impl fmt::Display for Tenancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.namespace)
    }
}

/// Identity of a resource.
///
/// `uid` distinguishes incarnations of the same name. It is assigned by the
/// store on creation and is optional on ids built by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub tenancy: Tenancy,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl ResourceId {
    pub fn new(resource_type: ResourceType, tenancy: Tenancy, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            tenancy,
            name: name.into(),
            uid: None,
        }
    }

    /// Uid-less key used for indexing.
    pub fn key(&self) -> ReferenceKey {
        ReferenceKey {
            resource_type: self.resource_type.clone(),
            tenancy: self.tenancy.clone(),
            name: self.name.clone(),
        }
    }

    /// Same tenancy and name under another type, without a uid.
    ///
    /// Used for name-aligned resources such as a service and its endpoints.
    pub fn replace_type(&self, resource_type: ResourceType) -> Self {
        Self::new(resource_type, self.tenancy.clone(), self.name.clone())
    }

    pub fn without_uid(&self) -> Self {
        Self {
            uid: None,
            ..self.clone()
        }
    }

    pub fn is_type(&self, resource_type: &ResourceType) -> bool {
        &self.resource_type == resource_type
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.resource_type, self.tenancy, self.name)
    }
}

/// `(type, tenancy, name)` with the uid stripped; ordered and hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey {
    pub resource_type: ResourceType,
    pub tenancy: Tenancy,
    pub name: String,
}

impl ReferenceKey {
    pub fn to_id(&self) -> ResourceId {
        ResourceId::new(
            self.resource_type.clone(),
            self.tenancy.clone(),
            self.name.clone(),
        )
    }
}

impl From<&ResourceId> for ReferenceKey {
    fn from(id: &ResourceId) -> Self {
        id.key()
    }
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.resource_type, self.tenancy, self.name)
    }
}

/// Tri-state condition value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionState {
    #[default]
    Unknown,
    True,
    False,
}

impl From<bool> for ConditionState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

/// A named observation written by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub state: ConditionState,
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    pub fn new(
        condition_type: impl Into<String>,
        state: ConditionState,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type: condition_type.into(),
            state,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Status entry owned by a single controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub observed_generation: u64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Stamped by the store on every status write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Status {
    pub fn new(observed_generation: u64, conditions: Vec<Condition>) -> Self {
        Self {
            observed_generation,
            conditions,
            updated_at: None,
        }
    }

    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Structural equality ignoring the store-assigned timestamp.
    pub fn equivalent(&self, other: &Status) -> bool {
        self.observed_generation == other.observed_generation && self.conditions == other.conditions
    }
}

/// A versioned resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ResourceId>,
    /// Bumped on every write, including status writes.
    #[serde(default)]
    pub version: u64,
    /// Bumped only when `data` changes.
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub status: BTreeMap<String, Status>,
}

impl Resource {
    /// Creates an unversioned resource carrying `data`.
    pub fn new<T: Serialize>(id: ResourceId, data: &T) -> Result<Self, ResourceError> {
        Ok(Self {
            id,
            owner: None,
            version: 0,
            generation: 0,
            metadata: BTreeMap::new(),
            data: serde_json::to_value(data)?,
            status: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn with_owner(mut self, owner: ResourceId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Decodes the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ResourceError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ResourceError::Decode(format!("{}: {e}", self.id)))
    }

    pub fn status_for(&self, key: &str) -> Option<&Status> {
        self.status.get(key)
    }
}

/// Type of the markers the store leaves behind for deleted resources.
pub const TOMBSTONE_TYPE: ResourceType = ResourceType::new_static("internal", "v1", "Tombstone");

/// Payload of a tombstone: the deleted resource whose children must be reaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub owner: ResourceId,
}

/// Change notification emitted by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Created, updated, or had a status written.
    Upsert(Resource),
    Delete(Resource),
}

impl WatchEvent {
    pub fn resource(&self) -> &Resource {
        match self {
            WatchEvent::Upsert(r) | WatchEvent::Delete(r) => r,
        }
    }
}
