//! Service payload

use crate::workload::Protocol;
use serde::{Deserialize, Serialize};

/// A named set of workloads chosen by a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workloads: Option<WorkloadSelector>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    #[serde(default)]
    pub virtual_ips: Vec<String>,
}

impl Service {
    /// A service is managed when it has a selector with at least one name or
    /// prefix. An empty-string prefix counts.
    pub fn is_managed(&self) -> bool {
        self.workloads.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Selects workloads by exact name or name prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSelector {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
}

impl WorkloadSelector {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.prefixes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default)]
    pub virtual_port: u32,
    /// Name of the workload port traffic is sent to.
    pub target_port: String,
    #[serde(default)]
    pub protocol: Protocol,
}

impl ServicePort {
    pub fn new(target_port: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            virtual_port: 0,
            target_port: target_port.into(),
            protocol,
        }
    }
}
