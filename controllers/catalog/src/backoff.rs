//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff for requeueing failed reconciles.
//! It grows more slowly than exponential backoff, so a resource waiting on
//! another controller (for example a workload whose node has not been
//! reconciled yet) is retried promptly without hammering the store.
//!
//! Sequence with the defaults: 1s, 1s, 2s, 3s, 5s, 8s, ... 60s (max).

use parking_lot::Mutex;
use resource_client::ReferenceKey;
use std::collections::HashMap;
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff (for reset)
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }
}

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Per-resource backoff driving requeue delays after failed reconciles.
#[derive(Debug)]
pub struct BackoffTracker {
    min: Duration,
    max: Duration,
    /// Consecutive failures per resource; removed on success
    states: Mutex<HashMap<ReferenceKey, BackoffState>>,
}

impl BackoffTracker {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure and returns how long to wait before retrying.
    pub fn record_failure(&self, key: &ReferenceKey) -> Duration {
        let mut states = self.states.lock();
        let state = states.entry(key.clone()).or_insert_with(|| BackoffState {
            backoff: FibonacciBackoff::new(self.min, self.max),
            error_count: 0,
        });
        state.error_count += 1;
        state.backoff.next_backoff()
    }

    pub fn record_success(&self, key: &ReferenceKey) {
        self.states.lock().remove(key);
    }

    pub fn error_count(&self, key: &ReferenceKey) -> u32 {
        self.states.lock().get(key).map_or(0, |s| s.error_count)
    }
}
