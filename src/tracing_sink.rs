use crate::record::{Level, LogRecord};
use crate::sink::{Sink, SinkError};

/// Re-emits records as `tracing` events under the `app_log_sink` target.
///
/// Severities map onto `tracing` levels: up to [`Level::ERROR`] becomes
/// `ERROR`, [`Level::WARNING`] `WARN`, notice/info `INFO`, anything above
/// `DEBUG`. Useful for local development with a `fmt` subscriber, or to
/// feed records into an existing `tracing` pipeline.
#[derive(Clone, Default)]
pub struct TracingSink;

macro_rules! emit {
    ($level:expr, $record:expr) => {
        tracing::event!(
            target: "app_log_sink",
            $level,
            fingerprint = $record.fingerprint(),
            kind = $record.kind(),
            file = $record.source_file(),
            line = $record.source_line(),
            url = $record.url(),
            "{}",
            $record.message()
        )
    };
}

impl Sink for TracingSink {
    fn write(&self, record: &LogRecord, level: Level) -> Result<(), SinkError> {
        match level.value() {
            i32::MIN..=3 => emit!(tracing::Level::ERROR, record),
            4 => emit!(tracing::Level::WARN, record),
            5 | 6 => emit!(tracing::Level::INFO, record),
            _ => emit!(tracing::Level::DEBUG, record),
        }
        Ok(())
    }
}
