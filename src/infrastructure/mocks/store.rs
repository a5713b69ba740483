//! Scripted key store for testing.

use crate::application::error::StoreError;
use crate::application::ports::KeyStore;
use crate::domain::claim::ClaimOutcome;
use crate::domain::token::IdempotencyToken;
use crate::infrastructure::memory_store::MemoryKeyStore;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Key store whose answers can be scripted.
///
/// Scripted results are returned first, in order. Once the script is
/// exhausted, calls fall through to an in-memory store so normal claim
/// semantics apply. Every call is counted, and an optional delay makes the
/// store slow enough to trip the gate's timeout.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeyStore {
    script: Arc<Mutex<VecDeque<Result<ClaimOutcome, StoreError>>>>,
    fallback: MemoryKeyStore,
    claim_calls: Arc<AtomicUsize>,
    exists_calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl ScriptedKeyStore {
    /// Create a store with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an outcome for the next unscripted claim.
    pub fn push_outcome(&self, outcome: ClaimOutcome) {
        self.script_lock().push_back(Ok(outcome));
    }

    /// Queue an error for the next unscripted claim.
    pub fn push_error(&self, error: StoreError) {
        self.script_lock().push_back(Err(error));
    }

    /// Number of `try_claim` calls so far.
    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    /// Number of `is_claimed` calls so far.
    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    fn script_lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<ClaimOutcome, StoreError>>> {
        self.script
            .lock()
            .expect("ScriptedKeyStore mutex poisoned - a test thread panicked while holding the lock")
    }
}

impl KeyStore for ScriptedKeyStore {
    fn try_claim(
        &self,
        token: &IdempotencyToken,
        ttl: Duration,
    ) -> impl Future<Output = Result<ClaimOutcome, StoreError>> + Send {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script_lock().pop_front();
        let fallback = self.fallback.clone();
        let token = token.clone();
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match scripted {
                Some(result) => result,
                None => Ok(fallback.claim(&token, ttl)),
            }
        }
    }

    fn is_claimed(
        &self,
        token: &IdempotencyToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        let fallback = self.fallback.clone();
        let token = token.clone();
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(fallback.contains(&token))
        }
    }
}
