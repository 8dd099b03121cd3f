//! Prometheus metrics for the Catalog Controller.
//!
//! All metrics carry the `catalog_` prefix and are labelled by controller name
//! (`node-health`, `workload-health`, `endpoint-manager`, `reaper`).

use crate::error::ControllerError;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

const METRICS_NAMESPACE: &str = "catalog";

/// Outcome label values
pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_REQUEUE: &str = "requeue";
pub const OUTCOME_ERROR: &str = "error";

/// Controller metrics and the registry they are exposed from.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Labels: `controller`, `result`
    reconciliations: CounterVec,
    /// Labels: `controller`
    reconcile_duration: HistogramVec,
    /// Labels: `controller`, `reason` (`scheduled`, `error`, `panic`)
    requeues: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let reconciliations = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_reconciliations_total"),
                "Total number of reconciliations by controller and result",
            ),
            &["controller", "result"],
        )?;
        registry.register(Box::new(reconciliations.clone()))?;

        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_reconcile_duration_seconds"),
                "Duration of reconciliations in seconds by controller",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
            &["controller"],
        )?;
        registry.register(Box::new(reconcile_duration.clone()))?;

        let requeues = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_requeues_total"),
                "Total number of requeues by controller and reason",
            ),
            &["controller", "reason"],
        )?;
        registry.register(Box::new(requeues.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            reconcile_duration,
            requeues,
        })
    }

    pub fn record_reconcile(&self, controller: &str, result: &str, duration: Duration) {
        self.reconciliations
            .with_label_values(&[controller, result])
            .inc();
        self.reconcile_duration
            .with_label_values(&[controller])
            .observe(duration.as_secs_f64());
    }

    pub fn record_requeue(&self, controller: &str, reason: &str) {
        self.requeues.with_label_values(&[controller, reason]).inc();
    }

    /// Renders every metric in the Prometheus text format.
    pub fn gather(&self) -> Result<String, ControllerError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ControllerError::Probe(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_reconcile("node-health", OUTCOME_SUCCESS, Duration::from_millis(3));
        metrics.record_requeue("reaper", "scheduled");

        let text = metrics.gather().unwrap();
        assert!(text.contains("catalog_reconciliations_total{controller=\"node-health\",result=\"success\"} 1"));
        assert!(text.contains("catalog_reconcile_duration_seconds_count{controller=\"node-health\"} 1"));
        assert!(text.contains("catalog_requeues_total{controller=\"reaper\",reason=\"scheduled\"} 1"));
    }

    #[test]
    fn test_instances_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_requeue("reaper", "error");
        assert!(!b.gather().unwrap().contains("reason=\"error\""));
    }
}
