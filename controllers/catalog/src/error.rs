//! Controller-specific error types.
//!
//! This module defines error types specific to the Catalog Controller
//! that are not covered by upstream library errors.

use resource_client::ResourceError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the Catalog Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Resource store error
    #[error("Resource store error: {0}")]
    Resource(#[from] ResourceError),

    /// Linked node exists but node health has not written its status yet
    #[error("Node health has not been reconciled for {0}")]
    NodeUnreconciled(String),

    /// Node health status exists but carries no `Healthy` condition
    #[error("Node health condition not found on {0}")]
    NodeHealthConditionNotFound(String),

    /// Node health condition reason is not a health value
    #[error("Node health is invalid on {0}")]
    NodeHealthInvalid(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Seed file could not be loaded
    #[error("Seed file error: {0}")]
    Seed(String),

    /// Reconcile did not finish in time
    #[error("Reconcile timed out after {0:?}")]
    Timeout(Duration),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Probe/metrics server failed
    #[error("Probe server error: {0}")]
    Probe(String),

    /// Metrics registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
