use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct AtomicMetrics {
    pushes_requested: AtomicU64,
    pushes_accepted: AtomicU64,
    pushes_rejected: AtomicU64,
    callbacks_received: AtomicU64,
    callbacks_applied: AtomicU64,
    callbacks_duplicate: AtomicU64,
    callbacks_unmatched: AtomicU64,
    callbacks_malformed: AtomicU64,
    persistence_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub pushes_requested: u64,
    pub pushes_accepted: u64,
    pub pushes_rejected: u64,
    pub callbacks_received: u64,
    pub callbacks_applied: u64,
    pub callbacks_duplicate: u64,
    pub callbacks_unmatched: u64,
    pub callbacks_malformed: u64,
    pub persistence_failures: u64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_push_requested(&self) {
        self.pushes_requested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_push_accepted(&self) {
        self.pushes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_push_rejected(&self) {
        self.pushes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_callback_received(&self) {
        self.callbacks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_callback_applied(&self) {
        self.callbacks_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_callback_duplicate(&self) {
        self.callbacks_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_callback_unmatched(&self) {
        self.callbacks_unmatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_callback_malformed(&self) {
        self.callbacks_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pushes_requested: self.pushes_requested.load(Ordering::Relaxed),
            pushes_accepted: self.pushes_accepted.load(Ordering::Relaxed),
            pushes_rejected: self.pushes_rejected.load(Ordering::Relaxed),
            callbacks_received: self.callbacks_received.load(Ordering::Relaxed),
            callbacks_applied: self.callbacks_applied.load(Ordering::Relaxed),
            callbacks_duplicate: self.callbacks_duplicate.load(Ordering::Relaxed),
            callbacks_unmatched: self.callbacks_unmatched.load(Ordering::Relaxed),
            callbacks_malformed: self.callbacks_malformed.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}
