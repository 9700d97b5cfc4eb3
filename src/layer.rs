use crate::pipeline::Pipeline;
use crate::record::LogRecord;
use crate::severity::Severity;
use serde_json::{Map, Value};
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogRecord`]s and
/// runs them through a [`Pipeline`] on the calling thread.
///
/// Events below `min_severity` are ignored before any record is built.
/// Filtering, context injection and the handlers' emit steps all happen
/// synchronously; a queued handler is what decouples the consumer.
pub struct PipelineLayer {
    pipeline: Arc<Pipeline>,
    min_severity: Severity,
    /// Total events seen by the layer (before the severity check).
    pub total_events: Arc<AtomicU64>,
    /// Events emitted by at least one handler.
    pub dispatched_events: Arc<AtomicU64>,
    /// Events that reached the pipeline but no handler emitted.
    pub suppressed_events: Arc<AtomicU64>,
}

impl PipelineLayer {
    pub fn new(pipeline: Arc<Pipeline>, min_severity: Severity) -> Self {
        Self {
            pipeline,
            min_severity,
            total_events: Arc::new(AtomicU64::new(0)),
            dispatched_events: Arc::new(AtomicU64::new(0)),
            suppressed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }
}

/// Build a [`LogRecord`] from a `tracing` event. The `message` field becomes
/// the record message, every other field an attribute.
pub fn record_from_event(event: &Event<'_>) -> LogRecord {
    let meta = event.metadata();
    let mut record = LogRecord::new(meta.target(), Severity::from(*meta.level()));
    record.module_path = meta.module_path().map(|s| s.to_string());
    record.file = meta.file().map(|s| s.to_string());
    record.line = meta.line();

    let mut visitor = FieldVisitor {
        fields: &mut record.attributes,
        message: &mut record.message,
    };
    event.record(&mut visitor);
    record
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if Severity::from(*event.metadata().level()) < self.min_severity {
            return;
        }

        let record = record_from_event(event);
        if self.pipeline.dispatch(record) > 0 {
            self.dispatched_events.fetch_add(1, Ordering::Relaxed);
        } else {
            self.suppressed_events.fetch_add(1, Ordering::Relaxed);
        }
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Map<String, Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), Value::String(format!("{:?}", value)));
        }
    }
}
