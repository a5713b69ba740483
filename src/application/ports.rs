//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::application::error::StoreError;
use crate::domain::claim::ClaimOutcome;
use crate::domain::token::IdempotencyToken;
use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for the shared claim store.
///
/// Implementations must be safe for concurrent use from many requests: the
/// store is the only synchronization point between them. Infrastructure
/// provides `MemoryKeyStore` and, with the `redis-store` feature, `RedisKeyStore`.
pub trait KeyStore: Clone + Send + Sync + Debug + 'static {
    /// Atomically claim a token for `ttl`.
    ///
    /// Returns `Claimed` if no live record existed and one was created by this
    /// call, `AlreadyClaimed` otherwise. This must be a single atomic backend
    /// operation: concurrent callers racing on the same token observe exactly
    /// one `Claimed` between them.
    fn try_claim(
        &self,
        token: &IdempotencyToken,
        ttl: Duration,
    ) -> impl Future<Output = Result<ClaimOutcome, StoreError>> + Send;

    /// Check whether a live record exists for `token`.
    ///
    /// Diagnostic only. Never use this to decide a claim.
    fn is_claimed(
        &self,
        token: &IdempotencyToken,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Operations that open a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// One gate decision for one request
    GateDecide,
    /// An atomic claim against the key store
    StoreTryClaim,
    /// A diagnostic existence check against the key store
    StoreExists,
}

/// Port for span production.
///
/// The gate asks the tracer for a span around every operation and records
/// into it unconditionally. A disabled tracer hands back
/// `tracing::Span::none()`, on which every record is a no-op.
///
/// Spans must declare the fields `outcome`, `token`, `otel.status_code` and
/// `error` so callers can record them after creation.
pub trait Tracer: Clone + Send + Sync + Debug + 'static {
    /// Open a span for `operation` as a child of the current span.
    fn span(&self, operation: Operation) -> tracing::Span;
}
