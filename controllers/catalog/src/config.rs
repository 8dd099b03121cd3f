//! Controller configuration from environment variables.

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings for the catalog controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Concurrent reconciles per controller
    pub workers: usize,
    pub reconcile_timeout: Duration,
    /// Wait between the reaper's first and second pass
    pub reaper_second_pass_delay: Duration,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    /// Address for `/healthz`, `/readyz` and `/metrics`
    pub probe_addr: SocketAddr,
    /// YAML file of resources loaded into the store at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            reconcile_timeout: Duration::from_secs(30),
            reaper_second_pass_delay: Duration::from_secs(30),
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            probe_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            seed_file: None,
        }
    }
}

impl ControllerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> Result<Duration, ControllerError> {
            Ok(parse(&lookup, key)?.map_or(default, Duration::from_secs))
        };

        let config = Self {
            workers: parse(&lookup, "CATALOG_WORKERS")?.unwrap_or(defaults.workers),
            reconcile_timeout: secs("CATALOG_RECONCILE_TIMEOUT_SECS", defaults.reconcile_timeout)?,
            reaper_second_pass_delay: secs(
                "CATALOG_REAPER_SECOND_PASS_DELAY_SECS",
                defaults.reaper_second_pass_delay,
            )?,
            backoff_min: secs("CATALOG_BACKOFF_MIN_SECS", defaults.backoff_min)?,
            backoff_max: secs("CATALOG_BACKOFF_MAX_SECS", defaults.backoff_max)?,
            probe_addr: parse(&lookup, "CATALOG_PROBE_ADDR")?.unwrap_or(defaults.probe_addr),
            seed_file: lookup("CATALOG_SEED_FILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };

        if config.workers == 0 {
            return Err(ControllerError::InvalidConfig(
                "CATALOG_WORKERS must be at least 1".to_string(),
            ));
        }
        if config.backoff_min > config.backoff_max {
            return Err(ControllerError::InvalidConfig(
                "CATALOG_BACKOFF_MIN_SECS must not exceed CATALOG_BACKOFF_MAX_SECS".to_string(),
            ));
        }
        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ControllerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                ControllerError::InvalidConfig(format!("{key}={raw:?} is invalid: {e}"))
            })
        })
        .transpose()
}
