//! Tracer adapters.
//!
//! `NoopTracer` is the default and hands out disabled spans. `SpanTracer`
//! opens real `tracing` spans named after each operation, which any
//! subscriber (including an OpenTelemetry bridge) can export.

use crate::application::ports::{Operation, Tracer};
use tracing::field::Empty;
use tracing::{info_span, Span};

/// Tracer that produces disabled spans.
///
/// Recording into a disabled span does nothing, so callers never need to
/// check whether tracing is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn span(&self, _operation: Operation) -> Span {
        Span::none()
    }
}

/// Tracer that opens an INFO-level span per operation.
///
/// | Operation       | Span name                 |
/// |-----------------|---------------------------|
/// | `GateDecide`    | `IdempotencyGate.decide`  |
/// | `StoreTryClaim` | `KeyStore.try_claim`      |
/// | `StoreExists`   | `KeyStore.is_claimed`     |
///
/// Store failures set `otel.status_code = "ERROR"` and `error` on the span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanTracer;

impl SpanTracer {
    /// Create a new span tracer.
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for SpanTracer {
    fn span(&self, operation: Operation) -> Span {
        match operation {
            Operation::GateDecide => info_span!(
                "IdempotencyGate.decide",
                outcome = Empty,
                token = Empty,
                otel.status_code = Empty,
                error = Empty
            ),
            Operation::StoreTryClaim => info_span!(
                "KeyStore.try_claim",
                outcome = Empty,
                token = Empty,
                otel.status_code = Empty,
                error = Empty
            ),
            Operation::StoreExists => info_span!(
                "KeyStore.is_claimed",
                outcome = Empty,
                token = Empty,
                otel.status_code = Empty,
                error = Empty
            ),
        }
    }
}
