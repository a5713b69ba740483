//! Idempotency gate decision logic.
//!
//! The gate decides, per request, whether idempotency protection applies and
//! what the outcome is. It holds no per-request state: all coordination
//! between requests goes through the key store's atomic claim.

use crate::application::error::{ConfigError, StoreError};
use crate::application::metrics::GateMetrics;
use crate::application::ports::{KeyStore, Operation, Tracer};
use crate::domain::claim::{ClaimOutcome, DEFAULT_CLAIM_TTL};
use crate::domain::policy::FailurePolicy;
use crate::domain::request::{extract_token, is_mutating};
use crate::domain::token::IdempotencyToken;
use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use tracing::field::display;
use tracing::{debug, warn, Instrument, Span};

/// Default upper bound on a single key store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Read-only method; protection does not apply
    Bypass,
    /// Mutating method without a usable token; forwarded unprotected
    Unprotected,
    /// Token claimed by this request; forward
    Proceed,
    /// Token already claimed; answer without calling downstream
    Duplicate,
    /// Store failed and the policy is fail-open; forward
    StoreFailedOpen,
    /// Store failed and the policy is fail-closed; reject
    StoreFailedClosed,
}

impl GateDecision {
    /// Whether the downstream handler should run.
    pub fn forwards(&self) -> bool {
        match self {
            GateDecision::Bypass
            | GateDecision::Unprotected
            | GateDecision::Proceed
            | GateDecision::StoreFailedOpen => true,
            GateDecision::Duplicate | GateDecision::StoreFailedClosed => false,
        }
    }

    /// Status to answer with when the request is not forwarded.
    ///
    /// Duplicates get `200 OK` with no replay of the original response.
    pub fn short_circuit_status(&self) -> Option<StatusCode> {
        match self {
            GateDecision::Duplicate => Some(StatusCode::OK),
            GateDecision::StoreFailedClosed => Some(StatusCode::SERVICE_UNAVAILABLE),
            _ => None,
        }
    }

    /// Short name used in logs and span fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Bypass => "bypass",
            GateDecision::Unprotected => "unprotected",
            GateDecision::Proceed => "proceed",
            GateDecision::Duplicate => "duplicate",
            GateDecision::StoreFailedOpen => "store_failed_open",
            GateDecision::StoreFailedClosed => "store_failed_closed",
        }
    }
}

/// Gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Lifetime of a claim record (default: 3 minutes)
    pub claim_ttl: Duration,
    /// Upper bound on a single store call (default: 1 second)
    pub store_timeout: Duration,
    /// What to do when the store fails (default: fail-open)
    pub failure_policy: FailurePolicy,
}

impl GateConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` if the TTL or timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.claim_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            claim_ttl: DEFAULT_CLAIM_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Decides whether a request proceeds, based on an atomic claim of its token.
#[derive(Debug, Clone)]
pub struct IdempotencyGate<K, T> {
    store: K,
    tracer: T,
    config: GateConfig,
    metrics: GateMetrics,
}

impl<K, T> IdempotencyGate<K, T>
where
    K: KeyStore,
    T: Tracer,
{
    /// Create a gate.
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` is invalid.
    pub fn new(store: K, tracer: T, config: GateConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new_unchecked(store, tracer, config))
    }

    pub(crate) fn new_unchecked(store: K, tracer: T, config: GateConfig) -> Self {
        Self {
            store,
            tracer,
            config,
            metrics: GateMetrics::new(),
        }
    }

    /// Get the gate configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Get the decision counters.
    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Get the underlying key store.
    pub fn store(&self) -> &K {
        &self.store
    }

    /// Decide what to do with a request.
    ///
    /// Makes at most one claim attempt and never retries it. Store failures
    /// are resolved by the configured [`FailurePolicy`].
    pub async fn decide(&self, method: &Method, headers: &HeaderMap) -> GateDecision {
        if !is_mutating(method) {
            self.metrics.record_bypassed();
            return GateDecision::Bypass;
        }

        let span = self.tracer.span(Operation::GateDecide);
        let decision = self
            .decide_mutating(headers, &span)
            .instrument(span.clone())
            .await;
        span.record("outcome", decision.as_str());
        debug!(method = %method, decision = decision.as_str(), "idempotency gate decision");
        decision
    }

    async fn decide_mutating(&self, headers: &HeaderMap, span: &Span) -> GateDecision {
        let Some(token) = extract_token(headers) else {
            self.metrics.record_unprotected();
            return GateDecision::Unprotected;
        };

        let fingerprint = token.fingerprint();
        span.record("token", display(fingerprint));

        match self.try_claim(&token).await {
            Ok(ClaimOutcome::Claimed) => {
                self.metrics.record_claimed();
                GateDecision::Proceed
            }
            Ok(ClaimOutcome::AlreadyClaimed) => {
                self.metrics.record_duplicate();
                GateDecision::Duplicate
            }
            Err(e) => {
                self.metrics.record_store_failure();
                span.record("otel.status_code", "ERROR");
                span.record("error", display(&e));
                warn!(
                    error = %e,
                    token = %fingerprint,
                    policy = %self.config.failure_policy,
                    "Idempotency claim failed"
                );

                if self.config.failure_policy.forwards() {
                    GateDecision::StoreFailedOpen
                } else {
                    self.metrics.record_rejected();
                    GateDecision::StoreFailedClosed
                }
            }
        }
    }

    /// Claim `token` for the configured TTL, bounded by the store timeout.
    pub async fn try_claim(&self, token: &IdempotencyToken) -> Result<ClaimOutcome, StoreError> {
        let span = self.tracer.span(Operation::StoreTryClaim);
        span.record("token", display(token.fingerprint()));

        let result = self
            .bounded(self.store.try_claim(token, self.config.claim_ttl))
            .instrument(span.clone())
            .await;

        match &result {
            Ok(outcome) => {
                span.record("outcome", outcome.as_str());
            }
            Err(e) => {
                span.record("otel.status_code", "ERROR");
                span.record("error", display(e));
            }
        }
        result
    }

    /// Check whether `token` currently holds a claim.
    ///
    /// Diagnostic only; the gate never uses this to decide a request.
    pub async fn is_claimed(&self, token: &IdempotencyToken) -> Result<bool, StoreError> {
        let span = self.tracer.span(Operation::StoreExists);
        span.record("token", display(token.fingerprint()));

        let result = self
            .bounded(self.store.is_claimed(token))
            .instrument(span.clone())
            .await;

        match &result {
            Ok(exists) => {
                span.record("outcome", if *exists { "present" } else { "absent" });
            }
            Err(e) => {
                span.record("otel.status_code", "ERROR");
                span.record("error", display(e));
            }
        }
        result
    }

    async fn bounded<F, R>(&self, fut: F) -> Result<R, StoreError>
    where
        F: std::future::Future<Output = Result<R, StoreError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.config.store_timeout)),
        }
    }
}
