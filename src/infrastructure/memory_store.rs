//! In-process key store backed by DashMap.
//!
//! Suitable for single-instance deployments and tests. Claims are only
//! shared between clones of the same `MemoryKeyStore`, not across processes;
//! use `RedisKeyStore` when several instances serve the same clients.
//!
//! ## Atomicity
//!
//! `try_claim` runs entirely under the DashMap shard lock for the token via
//! the entry API. The lock is taken and released synchronously inside the
//! call, never across an `.await`.
//!
//! ## Expiry
//!
//! Expired records are treated as absent: the next claim overwrites them in
//! place. Claims also sweep every expired record out of the map once per
//! sweep interval (60 seconds by default, measured on the store's clock), so
//! a stream of unique tokens does not grow the map without bound.
//! `purge_expired` runs the same sweep on demand.

use crate::application::error::StoreError;
use crate::application::ports::{Clock, KeyStore};
use crate::domain::claim::{ClaimOutcome, ClaimRecord};
use crate::domain::token::IdempotencyToken;
use crate::infrastructure::clock::SystemClock;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::future::{ready, Future};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Default minimum time between two automatic sweeps of expired records.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Thread-safe in-memory claim store.
///
/// Clones share the same records.
#[derive(Clone)]
pub struct MemoryKeyStore {
    records: Arc<DashMap<IdempotencyToken, ClaimRecord>>,
    clock: Arc<dyn Clock>,
    last_sweep: Arc<Mutex<Instant>>,
    sweep_interval: Duration,
}

impl fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("records", &self.records.len())
            .field("clock", &self.clock)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl MemoryKeyStore {
    /// Create a store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a store with a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            records: Arc::new(DashMap::new()),
            clock,
            last_sweep: Arc::new(Mutex::new(now)),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Set the minimum time between automatic sweeps (default: 60 seconds).
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Atomically claim `token`. Synchronous core of [`KeyStore::try_claim`].
    ///
    /// Runs an expiry sweep first when one is due.
    pub fn claim(&self, token: &IdempotencyToken, ttl: Duration) -> ClaimOutcome {
        let now = self.clock.now();
        self.sweep_if_due(now);

        match self.records.entry(token.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(ClaimRecord::new(now, ttl));
                    ClaimOutcome::Claimed
                } else {
                    ClaimOutcome::AlreadyClaimed
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ClaimRecord::new(now, ttl));
                ClaimOutcome::Claimed
            }
        }
    }

    /// Whether a live record exists for `token`.
    pub fn contains(&self, token: &IdempotencyToken) -> bool {
        let now = self.clock.now();
        self.records
            .get(token)
            .map(|record| !record.is_expired(now))
            .unwrap_or(false)
    }

    /// Remove expired records and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.sweep(self.clock.now())
    }

    /// Number of stored records, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MemoryKeyStore {
    // Must be called without holding any entry guard: retain locks every shard.
    fn sweep_if_due(&self, now: Instant) {
        // Skip when another caller is already checking.
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last_sweep) < self.sweep_interval {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        let removed = self.sweep(now);
        if removed > 0 {
            tracing::debug!(removed, remaining = self.records.len(), "Swept expired idempotency claims");
        }
    }

    fn sweep(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.records.len())
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemoryKeyStore {
    fn try_claim(
        &self,
        token: &IdempotencyToken,
        ttl: Duration,
    ) -> impl Future<Output = Result<ClaimOutcome, StoreError>> + Send {
        ready(Ok(self.claim(token, ttl)))
    }

    fn is_claimed(
        &self,
        token: &IdempotencyToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        ready(Ok(self.contains(token)))
    }
}
