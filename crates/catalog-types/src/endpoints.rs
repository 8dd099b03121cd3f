//! ServiceEndpoints payload

use crate::health::Health;
use crate::workload::{DnsPolicy, WorkloadAddress, WorkloadPort};
use resource_client::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Endpoint list for a service, name-aligned with it and owned by it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoints {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// One selected workload as seen through the service's ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<ResourceId>,
    #[serde(default)]
    pub addresses: Vec<WorkloadAddress>,
    #[serde(default)]
    pub ports: BTreeMap<String, WorkloadPort>,
    pub health_status: Health,
    #[serde(default)]
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsPolicy>,
}
