//! Resource store watcher.
//!
//! Subscribes to store change events and fans them out to controller work
//! queues. Events for a controller's watched type enqueue the resource
//! itself; events for a dependency type enqueue whatever its mapper returns.
//! A full listing runs at startup and whenever the subscription falls
//! behind.

use crate::error::ControllerError;
use crate::queue::WorkQueue;
use crate::runtime::{Request, Watch};
use resource_client::{ResourceClientTrait, ResourceType, WatchEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Where events for one controller go.
#[derive(Debug)]
pub struct Route {
    pub name: &'static str,
    pub watched_type: ResourceType,
    pub watches: Vec<Watch>,
    pub queue: Arc<WorkQueue>,
}

/// Watches the store for changes.
pub struct Watcher {
    client: Arc<dyn ResourceClientTrait>,
    routes: Vec<Route>,
    /// Set once the initial listing has been queued
    ready: Arc<AtomicBool>,
}

impl Watcher {
    pub fn new(
        client: Arc<dyn ResourceClientTrait>,
        routes: Vec<Route>,
        ready: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client,
            routes,
            ready,
        }
    }

    /// Runs until the event stream closes.
    pub async fn run(self) -> Result<(), ControllerError> {
        // Subscribe before listing so nothing written in between is missed
        let mut events = self.client.subscribe();
        self.resync().await?;
        self.ready.store(true, Ordering::Release);
        info!("Initial sync complete");

        loop {
            match events.recv().await {
                Ok(event) => self.dispatch(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Watch fell behind, resyncing");
                    self.resync().await?;
                }
                Err(RecvError::Closed) => {
                    return Err(ControllerError::Watch("event stream closed".to_string()));
                }
            }
        }
    }

    /// Queues every resource of every watched type, plus whatever the
    /// current dependencies map to.
    ///
    /// Dependencies matter for watched resources that do not exist yet, such
    /// as endpoints for a service written before startup.
    pub async fn resync(&self) -> Result<(), ControllerError> {
        for route in &self.routes {
            let resources = self.client.list(&route.watched_type, None, None).await?;
            let mut queued = resources.len();
            for resource in resources {
                route.queue.add(Request::new(resource.id.without_uid()));
            }
            for watch in &route.watches {
                for dependency in self.client.list(&watch.resource_type, None, None).await? {
                    for request in (watch.mapper)(&dependency) {
                        route.queue.add(request);
                        queued += 1;
                    }
                }
            }
            debug!(controller = route.name, queued, "Queued resync");
        }
        Ok(())
    }

    /// Routes one change event to the affected queues.
    pub fn dispatch(&self, event: &WatchEvent) {
        let resource = event.resource();
        for route in &self.routes {
            if resource.id.is_type(&route.watched_type) {
                route.queue.add(Request::new(resource.id.without_uid()));
            }
            for watch in route
                .watches
                .iter()
                .filter(|w| resource.id.is_type(&w.resource_type))
            {
                for request in (watch.mapper)(resource) {
                    route.queue.add(request);
                }
            }
        }
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::map_owner_filtered;
    use crate::test_utils::*;
    use catalog_types::{Health, HEALTH_STATUS_TYPE, NODE_TYPE};

    fn node_route() -> Route {
        Route {
            name: "node-health",
            watched_type: NODE_TYPE,
            watches: vec![Watch {
                resource_type: HEALTH_STATUS_TYPE,
                mapper: map_owner_filtered(NODE_TYPE),
            }],
            queue: WorkQueue::new(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_routes_watched_and_dependency_types() {
        let client = create_test_client();
        let node = write_node(&client, "n1").await;
        let check = write_health_status(&client, &node.id, "ping", Health::Passing).await;
        let workload = write_workload(&client, "w1", &create_test_workload("")).await;
        let watcher = Watcher::new(
            Arc::new(client.clone()),
            vec![node_route()],
            Arc::new(AtomicBool::new(false)),
        );
        let queue = watcher.routes[0].queue.clone();

        watcher.dispatch(&WatchEvent::Upsert(workload));
        assert!(queue.is_empty());

        watcher.dispatch(&WatchEvent::Delete(check));
        watcher.dispatch(&WatchEvent::Upsert(node));
        // Both map to the same node
        assert_eq!(queue.len(), 1);
        let request = queue.next().await.unwrap();
        assert_eq!(request.id, node_id("n1"));
    }

    #[tokio::test]
    async fn test_run_resyncs_and_marks_ready() {
        let client = create_test_client();
        write_node(&client, "n1").await;
        write_node(&client, "n2").await;
        let ready = Arc::new(AtomicBool::new(false));
        let route = node_route();
        let queue = route.queue.clone();
        let watcher = Watcher::new(Arc::new(client.clone()), vec![route], ready.clone());

        let handle = tokio::spawn(watcher.run());
        while !ready.load(Ordering::Acquire) {
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.len(), 2);

        write_workload(&client, "w1", &create_test_workload("")).await;
        write_node(&client, "n3").await;
        while queue.len() < 3 {
            tokio::task::yield_now().await;
        }
        handle.abort();
    }
}
