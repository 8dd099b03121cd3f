//! Health model
//!
//! Health values are totally ordered by severity:
//! `Passing < Warning < Critical < Maintenance`. Combining health values always
//! keeps the worst one.

use crate::error::CatalogTypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Health {
    #[serde(rename = "HEALTH_PASSING")]
    Passing,
    #[serde(rename = "HEALTH_WARNING")]
    Warning,
    #[serde(rename = "HEALTH_CRITICAL")]
    Critical,
    #[serde(rename = "HEALTH_MAINTENANCE")]
    Maintenance,
}

impl Health {
    pub const ALL: [Health; 4] = [
        Health::Passing,
        Health::Warning,
        Health::Critical,
        Health::Maintenance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Health::Passing => "HEALTH_PASSING",
            Health::Warning => "HEALTH_WARNING",
            Health::Critical => "HEALTH_CRITICAL",
            Health::Maintenance => "HEALTH_MAINTENANCE",
        }
    }

    pub fn is_passing(self) -> bool {
        self == Health::Passing
    }

    /// Worst of the given values; `Passing` when there are none.
    pub fn aggregate<I>(healths: I) -> Health
    where
        I: IntoIterator<Item = Health>,
    {
        let mut worst = Health::Passing;
        for health in healths {
            worst = worst.max(health);
            if worst == Health::Maintenance {
                break;
            }
        }
        worst
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Health {
    type Err = CatalogTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Health::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| CatalogTypeError::InvalidHealth(s.to_string()))
    }
}

/// A single health check result, owned by the node or workload it reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    #[serde(rename = "type", default)]
    pub check_type: String,
    pub status: Health,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub output: String,
}

impl HealthStatus {
    pub fn new(check_type: impl Into<String>, status: Health) -> Self {
        Self {
            check_type: check_type.into(),
            status,
            description: String::new(),
            output: String::new(),
        }
    }
}
