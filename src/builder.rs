use crate::context::{ProcessContext, RequestContext};
use crate::environment::EnvironmentSnapshot;
use crate::record::{Level, LogRecord, TraceFrame, MESSAGE_TYPE};
use crate::report::Reportable;
use crate::trace::{self, RawFrame};
use std::panic::Location;
use std::sync::Arc;

/// Turns caught errors and plain messages into [`LogRecord`]s.
///
/// Every build captures a fresh [`EnvironmentSnapshot`] from the bound
/// [`RequestContext`]; nothing is cached between events.
#[derive(Clone)]
pub struct LogRecordBuilder {
    context: Arc<dyn RequestContext>,
}

impl Default for LogRecordBuilder {
    fn default() -> Self {
        LogRecordBuilder::new(Arc::new(ProcessContext))
    }
}

impl LogRecordBuilder {
    pub fn new(context: Arc<dyn RequestContext>) -> Self {
        LogRecordBuilder { context }
    }

    fn url(&self) -> String {
        self.context.request_uri().unwrap_or_default()
    }

    /// Record for a raised error, located where the error originated.
    pub fn build_from_error(&self, error: &dyn Reportable, level: Level) -> LogRecord {
        LogRecord::new(
            self.url(),
            error.kind().to_string(),
            error.file().to_string(),
            error.line(),
            error.message(),
            EnvironmentSnapshot::capture(self.context.as_ref()),
            trace::normalize(error.trace()),
            level,
        )
    }

    /// Record for a plain message, located at the caller of the logging call.
    ///
    /// The context's call stack has the logging call as frame zero; it is
    /// dropped, frame one becomes the source location and the rest forms the
    /// trace. When the context cannot produce at least two frames, the
    /// location of this call is used instead.
    #[track_caller]
    pub fn build_from_message(&self, text: impl Into<String>, level: Level) -> LogRecord {
        self.build_from_message_with_caller(text.into(), level, Location::caller())
    }

    pub(crate) fn build_from_message_with_caller(
        &self,
        text: String,
        level: Level,
        caller: &Location<'_>,
    ) -> LogRecord {
        let mut stack = self.context.call_stack();
        if stack.len() < 2 {
            stack = vec![RawFrame::from(Location::caller()), RawFrame::from(caller)];
        }
        let trace: Vec<TraceFrame> = trace::normalize(stack.into_iter().skip(1));
        let (source_file, source_line) = trace
            .first()
            .map(|frame| (frame.file.clone(), frame.line))
            .unwrap_or_default();

        LogRecord::new(
            self.url(),
            MESSAGE_TYPE.to_string(),
            source_file,
            source_line,
            text,
            EnvironmentSnapshot::capture(self.context.as_ref()),
            trace,
            level,
        )
    }

    /// Record for a message whose location is already known, e.g. the
    /// metadata of a `tracing` event.
    pub fn build_at(&self, text: impl Into<String>, level: Level, file: &str, line: u32) -> LogRecord {
        LogRecord::new(
            self.url(),
            MESSAGE_TYPE.to_string(),
            file.to_string(),
            line,
            text.into(),
            EnvironmentSnapshot::capture(self.context.as_ref()),
            vec![TraceFrame::new(file, line)],
            level,
        )
    }
}
