use crate::logger::Logger;
use crate::record::Level;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

thread_local! {
    // Set while an event is being forwarded; breaks Logger -> TracingSink -> layer loops.
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// `tracing_subscriber` layer that hands events to a [`Logger`].
///
/// Events at or above `min_level` (by default only `ERROR`) become plain
/// messages located at the event's callsite, and go through the logger's
/// sinks synchronously on the emitting thread. Structured fields are
/// appended to the message as `key=value` pairs.
pub struct LoggerLayer {
    logger: Arc<Logger>,
    min_level: tracing::Level,
}

impl LoggerLayer {
    pub fn new(logger: Arc<Logger>, min_level: tracing::Level) -> Self {
        LoggerLayer { logger, min_level }
    }
}

/// Syslog-style severity for a `tracing` level.
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    if *level == tracing::Level::ERROR {
        Level::ERROR
    } else if *level == tracing::Level::WARN {
        Level::WARNING
    } else if *level == tracing::Level::INFO {
        Level::INFO
    } else {
        Level::DEBUG
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > self.min_level {
            return;
        }
        if FORWARDING.with(|forwarding| forwarding.replace(true)) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        let mut text = message.unwrap_or_default();
        for (key, value) in &fields {
            if !text.is_empty() {
                text.push(' ');
            }
            let _ = write!(text, "{key}={value}");
        }

        self.logger.log_at(
            text,
            level_from_tracing(meta.level()),
            meta.file().unwrap_or_default(),
            meta.line().unwrap_or_default(),
        );
        FORWARDING.with(|forwarding| forwarding.set(false));
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
