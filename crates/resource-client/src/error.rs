//! Resource store errors

use thiserror::Error;

/// Errors returned by a resource store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// Resource (or the requested incarnation of it) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Compare-and-swap failed: the stored version moved on
    #[error("Version conflict on {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Request refers to an unregistered type or is otherwise malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Store could not serve the request right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Payload could not be encoded or decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ResourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ResourceError::VersionConflict { .. })
    }
}

impl From<serde_json::Error> for ResourceError {
    fn from(err: serde_json::Error) -> Self {
        ResourceError::Decode(err.to_string())
    }
}
