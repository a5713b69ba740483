//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Mock clock for testing.
///
/// Lets tests step across claim TTL windows without sleeping.
///
/// # Examples
///
/// ```
/// use idempotency_gate::infrastructure::mocks::MockClock;
/// use idempotency_gate::{ClaimOutcome, IdempotencyToken, MemoryKeyStore};
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// let clock = MockClock::new(Instant::now());
/// let store = MemoryKeyStore::with_clock(Arc::new(clock.clone()));
/// let token = IdempotencyToken::parse("abc").unwrap();
/// let ttl = Duration::from_secs(180);
///
/// assert_eq!(store.claim(&token, ttl), ClaimOutcome::Claimed);
/// assert_eq!(store.claim(&token, ttl), ClaimOutcome::AlreadyClaimed);
///
/// clock.advance(Duration::from_secs(181));
/// assert_eq!(store.claim(&token, ttl), ClaimOutcome::Claimed);
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Instant> {
        self.current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.lock() += duration;
    }

    /// Jump the clock to `instant`, which may be in the past.
    pub fn set(&self, instant: Instant) {
        *self.lock() = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.lock()
    }
}
