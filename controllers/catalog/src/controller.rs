//! Main controller implementation.
//!
//! This module contains the `Controller` struct that runs every catalog
//! controller against one resource store:
//! - one `WorkQueue` and worker pool per registration
//! - one `Watcher` feeding all queues from store change events
//!
//! Workers bound each reconcile with a timeout, retry failures after a
//! per-resource Fibonacci backoff, and honour requested requeues.

use crate::backoff::BackoffTracker;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::{Metrics, OUTCOME_ERROR, OUTCOME_REQUEUE, OUTCOME_SUCCESS};
use crate::queue::WorkQueue;
use crate::reconciler::registrations;
use crate::runtime::{Action, ControllerRegistration, Reconciler, Request, Runtime};
use crate::watcher::{Route, Watcher};
use futures::FutureExt;
use resource_client::ResourceClientTrait;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Drains one controller's queue.
struct Worker {
    name: &'static str,
    reconciler: Arc<dyn Reconciler>,
    runtime: Runtime,
    queue: Arc<WorkQueue>,
    backoff: BackoffTracker,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl Worker {
    async fn run(self: Arc<Self>) {
        while let Some(request) = self.queue.next().await {
            let key = request.id.key();
            let span = info_span!("reconcile", controller = self.name, id = %request.id);
            let outcome = AssertUnwindSafe(self.process(request.clone()))
                .catch_unwind()
                .instrument(span.clone())
                .await;
            if outcome.is_err() {
                // The key must still reach `done`, or it stays in flight forever
                let delay = self.backoff.record_failure(&key);
                self.metrics.record_requeue(self.name, "panic");
                span.in_scope(|| error!(retry_in = ?delay, "Reconcile panicked"));
                self.queue.add_after(request, delay);
            }
            self.queue.done(&key);
        }
        debug!(controller = self.name, "Worker stopped");
    }

    async fn process(&self, request: Request) {
        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.timeout,
            self.reconciler.reconcile(&self.runtime, &request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ControllerError::Timeout(self.timeout)),
        };
        let elapsed = started.elapsed();
        let key = request.id.key();

        match result {
            Ok(Action::Done) => {
                self.backoff.record_success(&key);
                self.metrics.record_reconcile(self.name, OUTCOME_SUCCESS, elapsed);
                debug!("Reconciled");
            }
            Ok(Action::RequeueAfter(delay)) => {
                self.backoff.record_success(&key);
                self.metrics.record_reconcile(self.name, OUTCOME_REQUEUE, elapsed);
                self.metrics.record_requeue(self.name, "scheduled");
                debug!(delay = ?delay, "Reconciled, requeue requested");
                self.queue.add_after(request, delay);
            }
            Err(e) => {
                let delay = self.backoff.record_failure(&key);
                self.metrics.record_reconcile(self.name, OUTCOME_ERROR, elapsed);
                self.metrics.record_requeue(self.name, "error");
                warn!(
                    error = %e,
                    attempts = self.backoff.error_count(&key),
                    retry_in = ?delay,
                    "Reconcile failed"
                );
                self.queue.add_after(request, delay);
            }
        }
    }
}

/// Running catalog controllers.
pub struct Controller {
    watcher: JoinHandle<Result<(), ControllerError>>,
    workers: Vec<JoinHandle<()>>,
    queues: Vec<Arc<WorkQueue>>,
    ready: Arc<AtomicBool>,
}

impl Controller {
    /// Starts every catalog controller.
    pub fn new(
        config: &ControllerConfig,
        client: Arc<dyn ResourceClientTrait>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::start(config, client, metrics, registrations(config))
    }

    /// Starts the given controllers. Must be called inside a Tokio runtime.
    pub fn start(
        config: &ControllerConfig,
        client: Arc<dyn ResourceClientTrait>,
        metrics: Arc<Metrics>,
        registrations: Vec<ControllerRegistration>,
    ) -> Self {
        let runtime = Runtime::new(client.clone());
        let ready = Arc::new(AtomicBool::new(false));
        let mut routes = Vec::with_capacity(registrations.len());
        let mut queues = Vec::with_capacity(registrations.len());
        let mut workers = Vec::new();

        for registration in registrations {
            let queue = WorkQueue::new();
            let worker = Arc::new(Worker {
                name: registration.name,
                reconciler: registration.reconciler,
                runtime: runtime.clone(),
                queue: queue.clone(),
                backoff: BackoffTracker::new(config.backoff_min, config.backoff_max),
                metrics: metrics.clone(),
                timeout: config.reconcile_timeout,
            });
            for _ in 0..registration.workers {
                workers.push(tokio::spawn(worker.clone().run()));
            }
            info!(
                controller = registration.name,
                watched_type = %registration.watched_type,
                workers = registration.workers,
                "Started controller"
            );

            routes.push(Route {
                name: registration.name,
                watched_type: registration.watched_type,
                watches: registration.watches,
                queue: queue.clone(),
            });
            queues.push(queue);
        }

        let watcher = Watcher::new(client, routes, ready.clone());
        let watcher = tokio::spawn(watcher.run());

        Self {
            watcher,
            workers,
            queues,
            ready,
        }
    }

    /// Set once the initial sync has been queued.
    pub fn readiness(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    /// Runs until `shutdown` resolves or the watcher fails, then stops.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), ControllerError> {
        let result = tokio::select! {
            () = shutdown => {
                info!("Shutdown requested");
                Ok(())
            }
            joined = &mut self.watcher => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "Watcher failed");
                    Err(e)
                }
                Err(e) => Err(ControllerError::Watch(e.to_string())),
            },
        };
        self.stop().await;
        result
    }

    /// Stops watching, lets in-flight reconciles finish, and waits for workers.
    pub async fn stop(self) {
        self.watcher.abort();
        for queue in &self.queues {
            queue.shutdown();
        }
        for result in futures::future::join_all(self.workers).await {
            if let Err(e) = result {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Controllers stopped");
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;
