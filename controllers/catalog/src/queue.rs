//! Per-controller work queue.
//!
//! Requests are keyed by resource identity (without uid):
//! - a key is queued at most once; re-adding replaces the pending request
//! - a key handed to a worker is not handed out again until [`WorkQueue::done`]
//! - a key re-added while in flight is queued again once it is done

use crate::runtime::Request;
use parking_lot::Mutex;
use resource_client::ReferenceKey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    order: VecDeque<ReferenceKey>,
    pending: HashMap<ReferenceKey, Request>,
    in_flight: HashSet<ReferenceKey>,
    /// Re-added while in flight
    dirty: HashMap<ReferenceKey, Request>,
    shutdown: bool,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, request: Request) {
        let key = request.id.key();
        {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            if state.in_flight.contains(&key) {
                state.dirty.insert(key, request);
                return;
            }
            if state.pending.insert(key.clone(), request).is_some() {
                return;
            }
            state.order.push_back(key);
        }
        self.notify.notify_one();
    }

    /// Adds `request` once `delay` has passed.
    pub fn add_after(self: &Arc<Self>, request: Request, delay: Duration) {
        if delay.is_zero() {
            self.add(request);
            return;
        }
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(request);
        });
    }

    /// Waits for the next request. Returns `None` after shutdown.
    pub async fn next(&self) -> Option<Request> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if state.shutdown {
                    return None;
                }
                while let Some(key) = state.order.pop_front() {
                    if let Some(request) = state.pending.remove(&key) {
                        state.in_flight.insert(key);
                        return Some(request);
                    }
                }
            }
            notified.await;
        }
    }

    /// Marks a key's reconcile as finished.
    pub fn done(&self, key: &ReferenceKey) {
        let requeued = {
            let mut state = self.state.lock();
            state.in_flight.remove(key);
            match state.dirty.remove(key) {
                Some(request) if !state.shutdown => {
                    if state.pending.insert(key.clone(), request).is_none() {
                        state.order.push_back(key.clone());
                    }
                    true
                }
                _ => false,
            }
        };
        if requeued {
            self.notify.notify_one();
        }
    }

    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.notify.notify_waiters();
    }

    /// Requests waiting to be handed out.
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
