use crate::record::{Level, LogRecord};
use crate::sink::{Sink, SinkError};

/// A sink that simply drops all records.
///
/// Useful for measuring the cost of record building alone, and as the
/// `noop://` backend for environments where logging is switched off.
#[derive(Clone, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn write(&self, _record: &LogRecord, _level: Level) -> Result<(), SinkError> {
        Ok(())
    }
}
