use crate::builder::LogRecordBuilder;
use crate::context::{ProcessContext, RequestContext};
use crate::record::{Level, LogRecord};
use crate::report::Reportable;
use crate::sink::Sink;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Entry point for application code: report a message or a caught error.
///
/// Each call builds one [`LogRecord`] and hands it to every configured
/// [`Sink`] in order, on the calling thread, before returning. Sink
/// failures (errors and panics alike) are absorbed per sink: the record is
/// dropped for that sink and the caller never sees it. A panicking sink
/// still goes through the process panic hook, which by default prints the
/// panic message to stderr; install a quiet hook to suppress it.
///
/// The sinks and context are fixed at construction.
pub struct Logger {
    sinks: Vec<Arc<dyn Sink>>,
    builder: LogRecordBuilder,
    /// Records built by this logger.
    total_records: AtomicU64,
    /// Sink writes that failed or panicked.
    dropped_records: AtomicU64,
}

impl Logger {
    /// Logger writing to a single sink, with a [`ProcessContext`].
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Logger::with_sinks([sink])
    }

    /// Logger writing every record to each of `sinks`.
    pub fn with_sinks<I>(sinks: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Sink>>,
    {
        Logger {
            sinks: sinks.into_iter().collect(),
            builder: LogRecordBuilder::new(Arc::new(ProcessContext)),
            total_records: AtomicU64::new(0),
            dropped_records: AtomicU64::new(0),
        }
    }

    /// Replace the ambient context records are built from.
    pub fn with_context(mut self, context: Arc<dyn RequestContext>) -> Self {
        self.builder = LogRecordBuilder::new(context);
        self
    }

    /// Log a plain message at `level`.
    ///
    /// The record is located at the caller of this method.
    #[track_caller]
    pub fn log_message(&self, text: impl Into<String>, level: impl Into<Level>) {
        let caller = Location::caller();
        let text = text.into();
        let level = level.into();
        self.isolated(|| self.builder.build_from_message_with_caller(text, level, caller), level);
    }

    /// Log a caught error at `level`.
    ///
    /// The record is located where the error originated.
    pub fn log_error(&self, error: &dyn Reportable, level: impl Into<Level>) {
        let level = level.into();
        self.isolated(|| self.builder.build_from_error(error, level), level);
    }

    /// Log a message at an already known source location.
    pub fn log_at(&self, text: impl Into<String>, level: impl Into<Level>, file: &str, line: u32) {
        let text = text.into();
        let level = level.into();
        self.isolated(|| self.builder.build_at(text, level, file, line), level);
    }

    pub fn total_records(&self) -> u64 {
        self.total_records.load(Ordering::Relaxed)
    }

    pub fn dropped_records(&self) -> u64 {
        self.dropped_records.load(Ordering::Relaxed)
    }

    fn isolated<F>(&self, build: F, level: Level)
    where
        F: FnOnce() -> LogRecord,
    {
        let Ok(record) = panic::catch_unwind(AssertUnwindSafe(build)) else {
            self.dropped_records.fetch_add(self.sinks.len() as u64, Ordering::Relaxed);
            return;
        };
        self.total_records.fetch_add(1, Ordering::Relaxed);

        for sink in &self.sinks {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.write(&record, level)));
            if !matches!(outcome, Ok(Ok(()))) {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
