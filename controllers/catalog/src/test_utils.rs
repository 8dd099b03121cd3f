//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::runtime::{Request, Runtime};
use catalog_types::status::{
    health_condition, NODE_HEALTH_STATUS_KEY, NODE_HEALTHY_MESSAGE, WORKLOAD_HEALTH_STATUS_KEY,
    WORKLOAD_HEALTHY_MESSAGE,
};
use catalog_types::*;
use resource_client::{
    MemoryResourceClient, Resource, ResourceClientTrait, ResourceId, Status, Tenancy,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Store with every catalog type registered
pub fn create_test_client() -> MemoryResourceClient {
    MemoryResourceClient::new(registered_types())
}

pub fn create_test_runtime(client: &MemoryResourceClient) -> Runtime {
    Runtime::new(Arc::new(client.clone()))
}

/// Namespaced tenancy used for workloads and services
pub fn default_tenancy() -> Tenancy {
    Tenancy::new("default", "default")
}

/// Partition-scoped tenancy used for nodes
pub fn node_tenancy() -> Tenancy {
    default_tenancy().partition_scoped()
}

pub fn node_id(name: &str) -> ResourceId {
    ResourceId::new(NODE_TYPE, node_tenancy(), name)
}

pub fn workload_id(name: &str) -> ResourceId {
    ResourceId::new(WORKLOAD_TYPE, default_tenancy(), name)
}

pub fn service_id(name: &str) -> ResourceId {
    ResourceId::new(SERVICE_TYPE, default_tenancy(), name)
}

pub fn endpoints_id(name: &str) -> ResourceId {
    ResourceId::new(SERVICE_ENDPOINTS_TYPE, default_tenancy(), name)
}

pub fn request(id: &ResourceId) -> Request {
    Request::new(id.clone())
}

/// Workload with one address, an `http` and a `grpc` port, and identity `api`
pub fn create_test_workload(node_name: &str) -> Workload {
    let mut ports = BTreeMap::new();
    ports.insert("http".to_string(), WorkloadPort::new(8080, Protocol::Http));
    ports.insert("grpc".to_string(), WorkloadPort::new(9090, Protocol::Grpc));
    Workload {
        addresses: vec![WorkloadAddress::new("10.0.0.1", &[])],
        ports,
        identity: "api".to_string(),
        node_name: node_name.to_string(),
        dns: None,
    }
}

pub fn create_test_service(prefixes: &[&str], ports: Vec<ServicePort>) -> Service {
    Service {
        workloads: Some(WorkloadSelector {
            names: Vec::new(),
            prefixes: prefixes.iter().map(ToString::to_string).collect(),
        }),
        ports,
        virtual_ips: Vec::new(),
    }
}

pub async fn write_node(client: &MemoryResourceClient, name: &str) -> Resource {
    let resource = Resource::new(node_id(name), &Node::default()).unwrap();
    client.write(resource).await.unwrap()
}

pub async fn write_workload(
    client: &MemoryResourceClient,
    name: &str,
    workload: &Workload,
) -> Resource {
    let resource = Resource::new(workload_id(name), workload).unwrap();
    client.write(resource).await.unwrap()
}

pub async fn write_service(client: &MemoryResourceClient, name: &str, service: &Service) -> Resource {
    let resource = Resource::new(service_id(name), service).unwrap();
    client.write(resource).await.unwrap()
}

/// Writes a `HealthStatus` named `name` owned by `owner`
pub async fn write_health_status(
    client: &MemoryResourceClient,
    owner: &ResourceId,
    name: &str,
    health: Health,
) -> Resource {
    let id = ResourceId::new(HEALTH_STATUS_TYPE, owner.tenancy.clone(), name);
    let resource = Resource::new(id, &HealthStatus::new("test-check", health))
        .unwrap()
        .with_owner(owner.clone());
    client.write(resource).await.unwrap()
}

/// Records node health as if the node health controller had run
pub async fn set_node_health(client: &MemoryResourceClient, name: &str, health: Health) {
    let status = Status::new(1, vec![health_condition(health, NODE_HEALTHY_MESSAGE)]);
    client
        .write_status(&node_id(name), NODE_HEALTH_STATUS_KEY, status)
        .await
        .unwrap();
}

/// Records workload health as if the workload health controller had run
pub async fn set_workload_health(client: &MemoryResourceClient, name: &str, health: Health) {
    let status = Status::new(1, vec![health_condition(health, WORKLOAD_HEALTHY_MESSAGE)]);
    client
        .write_status(&workload_id(name), WORKLOAD_HEALTH_STATUS_KEY, status)
        .await
        .unwrap();
}

pub async fn read(client: &MemoryResourceClient, id: &ResourceId) -> Resource {
    client.read(id).await.unwrap()
}
