//! Subscriber metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Metrics for a single subscriber endpoint
///
/// The distributor side writes the delivery counters, the worker side
/// writes the handling counters.
#[derive(Debug, Default)]
pub struct SubscriberMetrics {
    /// Current queue length
    queue_len: AtomicUsize,
    /// Envelopes accepted into the queue
    delivered_count: AtomicU64,
    /// Envelopes dropped due to full queue
    dropped_count: AtomicU64,
    /// Envelopes dropped after the delivery timeout
    timeout_count: AtomicU64,
    /// Envelopes handled successfully by the worker
    handled_count: AtomicU64,
    /// Handler failures
    failure_count: AtomicU64,
    /// Envelopes skipped because they came from the subscriber's own interface
    self_skipped_count: AtomicU64,
}

impl SubscriberMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    pub fn inc_delivered_count(&self) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }

    pub fn inc_timeout_count(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handled_count(&self) -> u64 {
        self.handled_count.load(Ordering::Relaxed)
    }

    pub fn inc_handled_count(&self) {
        self.handled_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn self_skipped_count(&self) -> u64 {
        self.self_skipped_count.load(Ordering::Relaxed)
    }

    pub fn inc_self_skipped_count(&self) {
        self.self_skipped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            delivered_count: self.delivered_count(),
            dropped_count: self.dropped_count(),
            timeout_count: self.timeout_count(),
            handled_count: self.handled_count(),
            failure_count: self.failure_count(),
            self_skipped_count: self.self_skipped_count(),
        }
    }
}

/// Snapshot of subscriber metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub delivered_count: u64,
    pub dropped_count: u64,
    pub timeout_count: u64,
    pub handled_count: u64,
    pub failure_count: u64,
    pub self_skipped_count: u64,
}

impl MetricsSnapshot {
    /// Envelopes this subscriber never got
    pub fn lost(&self) -> u64 {
        self.dropped_count + self.timeout_count
    }
}
