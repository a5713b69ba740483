//! Clock adapters for claim expiry.
//!
//! `SystemClock` drives expiry in `MemoryKeyStore` by default. Tests swap in
//! `MockClock` (in `crate::infrastructure::mocks`) to step over TTL windows
//! without sleeping. It is available with the `test-helpers` feature:
//!
//! ```toml
//! [dev-dependencies]
//! idempotency-gate = { version = "*", features = ["test-helpers"] }
//! ```

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic wall clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
