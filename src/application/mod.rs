//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Idempotency gate (per-request decision making)
//! - Gate metrics (decision counters)
//! - Error taxonomy (configuration vs. transient store errors)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod error;
pub mod gate;
pub mod metrics;
pub mod ports;
