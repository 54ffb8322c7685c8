//! Atomic counters for one scheduler.
//!
//! Counters are incremented silently at the call site. Call
//! [`SchedulerMetrics::flush`] to emit current values as a single
//! `tracing::info!` event at the end of a run. Each scheduler owns its own
//! instance, so concurrent runs never share counts.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters, no allocations, no locking.
#[derive(Debug)]
pub struct SchedulerMetrics {
    units_dispatched: AtomicU64,
    units_completed: AtomicU64,
    units_failed: AtomicU64,
    units_timed_out: AtomicU64,
    retries: AtomicU64,
    sessions_launched: AtomicU64,
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerMetrics {
    pub const fn new() -> Self {
        Self {
            units_dispatched: AtomicU64::new(0),
            units_completed: AtomicU64::new(0),
            units_failed: AtomicU64::new(0),
            units_timed_out: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            sessions_launched: AtomicU64::new(0),
        }
    }

    pub fn inc_dispatched(&self) {
        self.units_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "units_dispatched", "counter incremented");
    }

    pub fn inc_completed(&self) {
        self.units_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "units_completed", "counter incremented");
    }

    pub fn inc_failed(&self) {
        self.units_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "units_failed", "counter incremented");
    }

    pub fn inc_timed_out(&self) {
        self.units_timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "units_timed_out", "counter incremented");
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retries", "counter incremented");
    }

    pub fn inc_sessions_launched(&self) {
        self.sessions_launched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sessions_launched", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            units_dispatched = self.units_dispatched(),
            units_completed = self.units_completed(),
            units_failed = self.units_failed(),
            units_timed_out = self.units_timed_out(),
            retries = self.retries(),
            sessions_launched = self.sessions_launched(),
        );
    }

    pub fn units_dispatched(&self) -> u64 {
        self.units_dispatched.load(Ordering::Relaxed)
    }

    pub fn units_completed(&self) -> u64 {
        self.units_completed.load(Ordering::Relaxed)
    }

    pub fn units_failed(&self) -> u64 {
        self.units_failed.load(Ordering::Relaxed)
    }

    pub fn units_timed_out(&self) -> u64 {
        self.units_timed_out.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn sessions_launched(&self) -> u64 {
        self.sessions_launched.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.units_dispatched.store(0, Ordering::Relaxed);
        self.units_completed.store(0, Ordering::Relaxed);
        self.units_failed.store(0, Ordering::Relaxed);
        self.units_timed_out.store(0, Ordering::Relaxed);
        self.retries.store(0, Ordering::Relaxed);
        self.sessions_launched.store(0, Ordering::Relaxed);
    }
}
