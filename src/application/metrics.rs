//! Observability metrics for gate decisions.
//!
//! Counts each decision path so short-circuited, forwarded and store-failure
//! requests can be told apart without inspecting responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for gate decisions.
///
/// All counters use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct GateMetrics {
    inner: Arc<GateMetricsInner>,
}

#[derive(Debug)]
struct GateMetricsInner {
    /// Read-only requests that skipped the gate
    bypassed: AtomicU64,
    /// Mutating requests without a token
    unprotected: AtomicU64,
    /// Requests whose token was claimed now
    claimed: AtomicU64,
    /// Requests short-circuited as duplicates
    duplicates: AtomicU64,
    /// Requests whose claim failed or timed out
    store_failures: AtomicU64,
    /// Requests rejected because of a store failure under fail-closed
    rejected: AtomicU64,
}

impl GateMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateMetricsInner {
                bypassed: AtomicU64::new(0),
                unprotected: AtomicU64::new(0),
                claimed: AtomicU64::new(0),
                duplicates: AtomicU64::new(0),
                store_failures: AtomicU64::new(0),
                rejected: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_bypassed(&self) {
        self.inner.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unprotected(&self) {
        self.inner.unprotected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_claimed(&self) {
        self.inner.claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.inner.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.inner.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Read-only requests forwarded without inspection.
    pub fn bypassed(&self) -> u64 {
        self.inner.bypassed.load(Ordering::Relaxed)
    }

    /// Mutating requests forwarded without a token.
    pub fn unprotected(&self) -> u64 {
        self.inner.unprotected.load(Ordering::Relaxed)
    }

    /// Requests forwarded after a successful claim.
    pub fn claimed(&self) -> u64 {
        self.inner.claimed.load(Ordering::Relaxed)
    }

    /// Requests answered as duplicates.
    pub fn duplicates(&self) -> u64 {
        self.inner.duplicates.load(Ordering::Relaxed)
    }

    /// Claim attempts that failed or timed out.
    pub fn store_failures(&self) -> u64 {
        self.inner.store_failures.load(Ordering::Relaxed)
    }

    /// Requests rejected under fail-closed.
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> GateMetricsSnapshot {
        GateMetricsSnapshot {
            bypassed: self.bypassed(),
            unprotected: self.unprotected(),
            claimed: self.claimed(),
            duplicates: self.duplicates(),
            store_failures: self.store_failures(),
            rejected: self.rejected(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.bypassed.store(0, Ordering::Relaxed);
        self.inner.unprotected.store(0, Ordering::Relaxed);
        self.inner.claimed.store(0, Ordering::Relaxed);
        self.inner.duplicates.store(0, Ordering::Relaxed);
        self.inner.store_failures.store(0, Ordering::Relaxed);
        self.inner.rejected.store(0, Ordering::Relaxed);
    }
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of gate metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateMetricsSnapshot {
    pub bypassed: u64,
    pub unprotected: u64,
    pub claimed: u64,
    pub duplicates: u64,
    pub store_failures: u64,
    pub rejected: u64,
}

impl GateMetricsSnapshot {
    /// Total requests seen by the gate.
    ///
    /// Every request lands in exactly one of bypassed, unprotected, claimed,
    /// duplicates or store_failures; `rejected` is a subset of store_failures.
    pub fn total_requests(&self) -> u64 {
        self.bypassed
            .saturating_add(self.unprotected)
            .saturating_add(self.claimed)
            .saturating_add(self.duplicates)
            .saturating_add(self.store_failures)
    }

    /// Fraction of claim attempts (0.0 to 1.0) that hit an existing record.
    ///
    /// Returns 0.0 if no claims have been attempted.
    pub fn duplicate_rate(&self) -> f64 {
        let attempts = self.claimed.saturating_add(self.duplicates);
        if attempts == 0 {
            0.0
        } else {
            self.duplicates as f64 / attempts as f64
        }
    }
}
