//! Mock tracing layer for testing.
//!
//! Captures events and spans, with their fields rendered as strings, so tests
//! can assert on what the gate logged and which spans it opened.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Mock layer that captures events and spans for testing.
#[derive(Clone, Default)]
pub struct MockCaptureLayer {
    inner: Arc<Mutex<Captured>>,
}

#[derive(Default)]
struct Captured {
    events: Vec<CapturedEvent>,
    spans: Vec<CapturedSpan>,
    span_index: HashMap<u64, usize>,
}

/// Captured event information.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Get a captured field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Captured span information, including fields recorded after creation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CapturedSpan {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub fields: BTreeMap<String, String>,
}

impl CapturedSpan {
    /// Get a captured field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl MockCaptureLayer {
    /// Create a new mock capture layer.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Captured> {
        self.inner
            .lock()
            .expect("MockCaptureLayer mutex poisoned - a test thread panicked while holding the lock")
    }

    /// Get all captured events.
    pub fn get_captured(&self) -> Vec<CapturedEvent> {
        self.lock().events.clone()
    }

    /// Get the count of captured events.
    pub fn count(&self) -> usize {
        self.lock().events.len()
    }

    /// Get all captured spans, in creation order.
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.lock().spans.clone()
    }

    /// Names of all captured spans, in creation order.
    pub fn span_names(&self) -> Vec<&'static str> {
        self.lock().spans.iter().map(|s| s.name).collect()
    }

    /// First captured span with the given name.
    pub fn find_span(&self, name: &str) -> Option<CapturedSpan> {
        self.lock().spans.iter().find(|s| s.name == name).cloned()
    }

    /// Clear all captured events and spans.
    pub fn clear(&self) {
        let mut captured = self.lock();
        captured.events.clear();
        captured.spans.clear();
        captured.span_index.clear();
    }
}

impl<S> Layer<S> for MockCaptureLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        let parent = ctx.span(id).and_then(|s| s.parent()).map(|p| p.name());

        let mut captured = self.lock();
        let index = captured.spans.len();
        captured.spans.push(CapturedSpan {
            name: attrs.metadata().name(),
            parent,
            fields: visitor.fields,
        });
        captured.span_index.insert(id.into_u64(), index);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        let mut captured = self.lock();
        if let Some(&index) = captured.span_index.get(&id.into_u64()) {
            captured.spans[index].fields.extend(visitor.fields);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor.fields.remove("message").unwrap_or_default();
        self.lock().events.push(CapturedEvent {
            level: *event.metadata().level(),
            message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}
