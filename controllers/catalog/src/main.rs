//! Catalog Controller
//!
//! Runs the service catalog reconciliation controllers against an in-memory
//! resource store:
//! - node-health: aggregates node health checks into a `Healthy` condition
//! - workload-health: combines workload checks with the linked node's health
//! - endpoint-manager: generates ServiceEndpoints for services with a selector
//! - reaper: deletes resources owned by deleted resources
//!
//! Probes and metrics are served on `CATALOG_PROBE_ADDR`.

mod backoff;
mod config;
mod controller;
mod error;
mod metrics;
mod probes;
mod queue;
mod reconcile_helpers;
mod reconciler;
mod runtime;
mod seed;
mod tracker;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use controller::Controller;
use resource_client::MemoryResourceClient;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Catalog Controller");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Workers per controller: {}", config.workers);
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!("  Reaper second pass delay: {:?}", config.reaper_second_pass_delay);
    info!("  Backoff: {:?} - {:?}", config.backoff_min, config.backoff_max);
    info!("  Probe address: {}", config.probe_addr);

    let client = MemoryResourceClient::new(catalog_types::registered_types());
    if let Some(path) = &config.seed_file {
        let resources = seed::load_seed_file(path)?;
        let count = resources.len();
        client.seed(resources)?;
        info!(path = %path.display(), count, "Loaded seed resources");
    }

    let metrics = Arc::new(Metrics::new()?);
    let controller = Controller::new(&config, Arc::new(client), metrics.clone());
    let mut probe_server = tokio::spawn(probes::serve(
        config.probe_addr,
        metrics,
        controller.readiness(),
    ));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    };

    tokio::select! {
        result = controller.run(shutdown) => {
            probe_server.abort();
            result
        }
        joined = &mut probe_server => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "Probe server failed");
                Err(e)
            }
            Err(e) => Err(ControllerError::Probe(e.to_string())),
        },
    }
}
