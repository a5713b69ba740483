//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of gate and store behavior.

pub mod clock;
pub mod layer;
pub mod store;

pub use clock::MockClock;
pub use layer::{CapturedEvent, CapturedSpan, MockCaptureLayer};
pub use store::ScriptedKeyStore;
