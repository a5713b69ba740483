//! # idempotency-gate
//!
//! `Idempotency-Key` middleware for `tower`/`http` services.
//!
//! Clients retrying a mutating request (POST, PUT, PATCH, DELETE) send the same
//! `Idempotency-Key` header on every attempt. The first attempt atomically
//! claims the key in a shared store and reaches your handler; repeats within
//! the claim TTL (3 minutes by default) are answered with `200 OK` and an empty
//! body without touching the handler.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{routing::post, Router};
//! use idempotency_gate::{IdempotencyLayer, MemoryKeyStore};
//!
//! let layer = IdempotencyLayer::new(MemoryKeyStore::new());
//!
//! let app: Router = Router::new()
//!     .route("/orders", post(|| async { "created" }))
//!     .layer(layer);
//! ```
//!
//! With a shared Redis backend and explicit settings:
//!
//! ```rust,ignore
//! use idempotency_gate::{FailurePolicy, IdempotencyLayer, RedisKeyStore, SpanTracer};
//! use std::time::Duration;
//!
//! // Reads IDEMPOTENCE_REDIS_HOST and IDEMPOTENCE_REDIS_PORT; fails if either is missing.
//! let store = RedisKeyStore::connect_from_env().await?;
//!
//! let layer = IdempotencyLayer::builder(store)
//!     .with_claim_ttl(Duration::from_secs(180))
//!     .with_store_timeout(Duration::from_millis(250))
//!     .with_failure_policy(FailurePolicy::FailOpen)
//!     .with_tracer(SpanTracer::new())
//!     .build()?;
//! ```
//!
//! ## How a Request Is Decided
//!
//! | Request                                    | Store call      | Result                          |
//! |--------------------------------------------|-----------------|---------------------------------|
//! | GET / HEAD / OPTIONS / other read methods  | none            | forwarded                       |
//! | mutating, no or empty `Idempotency-Key`    | none            | forwarded, unprotected          |
//! | mutating, key not yet claimed              | one atomic claim| forwarded                       |
//! | mutating, key already claimed              | one atomic claim| `200 OK`, empty body            |
//! | mutating, store error or timeout           | one atomic claim| per [`FailurePolicy`]           |
//!
//! Clients that do not send the header get no deduplication and no error.
//!
//! ## Atomic Claims
//!
//! The claim is a single test-and-set in the store, never an existence check
//! followed by a write. With Redis it is `SET key 1 NX PX ttl`; in memory it
//! is a DashMap entry update under the shard lock. Of N concurrent requests
//! carrying the same key, exactly one is forwarded.
//!
//! A claim is never rolled back. If the client disconnects after the claim
//! succeeds, the key still blocks retries until it expires.
//!
//! ## Store Failures
//!
//! Every store call is bounded by a timeout (1 second by default). A failed or
//! timed-out claim is logged at WARN with the token's fingerprint (never the
//! token itself), counted, and resolved by the configured policy:
//!
//! - [`FailurePolicy::FailOpen`] (default): forward as if unprotected
//! - [`FailurePolicy::FailClosed`]: reject with `503 Service Unavailable`
//!
//! ## Tracing
//!
//! Tracing is off by default ([`NoopTracer`]). Pass [`SpanTracer`] to the
//! builder to open one span per gate decision (`IdempotencyGate.decide`) and
//! per store call (`KeyStore.try_claim`), with store errors recorded as
//! `otel.status_code = "ERROR"`.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use idempotency_gate::{IdempotencyLayer, MemoryKeyStore};
//! # let layer = IdempotencyLayer::new(MemoryKeyStore::new());
//! let snapshot = layer.metrics().snapshot();
//! println!("duplicates: {}", snapshot.duplicates);
//! println!("store failures: {}", snapshot.store_failures);
//! println!("duplicate rate: {:.2}%", snapshot.duplicate_rate() * 100.0);
//! ```
//!
//! ## Limitations
//!
//! - Duplicates do not replay the original response; they always get an
//!   empty `200 OK`, even if the first attempt failed downstream.
//! - Only the token identifies a request. Bodies are not compared.

// Domain layer - pure types
pub mod domain;

// Application layer - gate orchestration and ports
pub mod application;

// Infrastructure layer - stores, tracers, tower integration
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    claim::{ClaimOutcome, ClaimRecord, DEFAULT_CLAIM_TTL},
    policy::FailurePolicy,
    request::{extract_token, is_mutating, IDEMPOTENCY_KEY_HEADER},
    token::{IdempotencyToken, TokenFingerprint},
};

pub use application::{
    error::{ConfigError, ConnectError, StoreError},
    gate::{GateConfig, GateDecision, IdempotencyGate, DEFAULT_STORE_TIMEOUT},
    metrics::{GateMetrics, GateMetricsSnapshot},
    ports::{Clock, KeyStore, Operation, Tracer},
};

pub use infrastructure::{
    clock::SystemClock,
    layer::{IdempotencyLayer, IdempotencyLayerBuilder, IdempotencyService},
    memory_store::{MemoryKeyStore, DEFAULT_SWEEP_INTERVAL},
    tracer::{NoopTracer, SpanTracer},
};

#[cfg(feature = "redis-store")]
pub use infrastructure::redis_store::{
    RedisKeyStore, RedisKeyStoreConfig, DEFAULT_KEY_PREFIX, REDIS_HOST_ENV, REDIS_PORT_ENV,
};
