//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Key stores (in-memory DashMap, Redis)
//! - Tracers (disabled vs `tracing` spans)
//! - HTTP integration (tower `Layer`/`Service`)

pub mod clock;
pub mod layer;
pub mod memory_store;
pub mod tracer;

#[cfg(feature = "redis-store")]
pub mod redis_store;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides controllable test doubles for clocks,
/// key stores and log capture.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// idempotency-gate = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
