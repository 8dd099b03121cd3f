//! Catalog type errors

use thiserror::Error;

/// Errors raised while interpreting catalog payloads and status
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogTypeError {
    /// String is not one of the `HEALTH_*` names
    #[error("Invalid health value: {0}")]
    InvalidHealth(String),

    /// Resource has no status entry under the given controller key
    #[error("No status entry for {0}")]
    StatusMissing(String),

    /// Status entry exists but lacks the named condition
    #[error("Condition {0} not found")]
    ConditionMissing(String),
}
