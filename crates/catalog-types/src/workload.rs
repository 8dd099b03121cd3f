//! Workload payload

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Application protocol spoken on a port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protocol {
    #[default]
    Unspecified,
    Tcp,
    Http,
    Http2,
    Grpc,
    Mesh,
}

/// A single instance of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    #[serde(default)]
    pub addresses: Vec<WorkloadAddress>,
    #[serde(default)]
    pub ports: BTreeMap<String, WorkloadPort>,
    #[serde(default)]
    pub identity: String,
    /// Name of the node this workload runs on; empty when unlinked.
    #[serde(default)]
    pub node_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsPolicy>,
}

impl Workload {
    pub fn node_name(&self) -> Option<&str> {
        if self.node_name.is_empty() {
            None
        } else {
            Some(&self.node_name)
        }
    }
}

/// An address and, optionally, the named ports reachable on it.
///
/// An empty `ports` list means every workload port is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadAddress {
    pub host: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub external: bool,
}

impl WorkloadAddress {
    pub fn new(host: impl Into<String>, ports: &[&str]) -> Self {
        Self {
            host: host.into(),
            ports: ports.iter().map(ToString::to_string).collect(),
            external: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadPort {
    pub port: u32,
    #[serde(default)]
    pub protocol: Protocol,
}

impl WorkloadPort {
    pub fn new(port: u32, protocol: Protocol) -> Self {
        Self { port, protocol }
    }
}

/// DNS answer weighting for a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsPolicy {
    pub weights: Weights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    pub passing: u32,
    pub warning: u32,
}
