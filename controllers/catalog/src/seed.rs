//! Seed file loading.
//!
//! A seed file is a YAML list of catalog resources written into the in-memory
//! store at startup:
//!
//! ```yaml
//! - kind: Node
//!   tenancy: { partition: default }
//!   name: node-1
//!   data:
//!     addresses: [{ host: 10.0.0.1 }]
//! - kind: HealthStatus
//!   tenancy: { partition: default }
//!   name: node-1-ping
//!   owner: { kind: Node, tenancy: { partition: default }, name: node-1 }
//!   data: { type: ping, status: HEALTH_PASSING }
//! ```

use crate::error::ControllerError;
use catalog_types::resource_type_for_kind;
use resource_client::{Resource, ResourceId, Tenancy};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SeedReference {
    kind: String,
    #[serde(default)]
    tenancy: Tenancy,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SeedEntry {
    #[serde(flatten)]
    reference: SeedReference,
    #[serde(default)]
    owner: Option<SeedReference>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl SeedReference {
    fn to_id(&self) -> Result<ResourceId, ControllerError> {
        let resource_type = resource_type_for_kind(&self.kind)
            .ok_or_else(|| ControllerError::Seed(format!("unknown kind {:?}", self.kind)))?;
        Ok(ResourceId::new(
            resource_type,
            self.tenancy.clone(),
            self.name.clone(),
        ))
    }
}

/// Parses seed YAML into unversioned resources.
pub fn parse_seed(yaml: &str) -> Result<Vec<Resource>, ControllerError> {
    let entries: Vec<SeedEntry> =
        serde_yaml::from_str(yaml).map_err(|e| ControllerError::Seed(e.to_string()))?;

    entries
        .into_iter()
        .map(|entry| {
            let mut resource = Resource::new(entry.reference.to_id()?, &entry.data)?;
            resource.metadata = entry.metadata;
            if let Some(owner) = &entry.owner {
                resource.owner = Some(owner.to_id()?);
            }
            Ok(resource)
        })
        .collect()
}

pub fn load_seed_file(path: &Path) -> Result<Vec<Resource>, ControllerError> {
    let yaml = std::fs::read_to_string(path)
        .map_err(|e| ControllerError::Seed(format!("{}: {e}", path.display())))?;
    parse_seed(&yaml)
}
