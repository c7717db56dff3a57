use crate::trace::{self, RawFrame};
use std::error::Error;
use std::fmt;
use std::panic::Location;

/// A raised error as the logger sees it.
///
/// The reported location is where the error originated, not where it was
/// caught. Implement this for error types that already track their origin;
/// for everything else wrap the error in an [`ErrorReport`].
pub trait Reportable {
    /// Concrete kind name, stored as the record's `type`.
    fn kind(&self) -> &str;
    fn file(&self) -> &str;
    fn line(&self) -> u32;
    fn message(&self) -> String;
    /// Stack at the origin, innermost first.
    fn trace(&self) -> Vec<RawFrame>;
}

/// An error captured together with its origin.
///
/// `ErrorReport::new` is `#[track_caller]`: build it where the error is
/// raised (typically in a `map_err`) and the report carries that location
/// and the stack leading to it, however far up it is later caught.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    kind: String,
    file: String,
    line: u32,
    message: String,
    trace: Vec<RawFrame>,
}

impl ErrorReport {
    #[track_caller]
    pub fn new<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let origin = Location::caller();
        // Drop the frame of this constructor; the trace starts at the origin.
        let trace = trace::capture_stack(trace::REPORT_ENTRY_FRAME)
            .into_iter()
            .skip(1)
            .collect();
        ErrorReport {
            kind: std::any::type_name::<E>().to_string(),
            file: origin.file().to_string(),
            line: origin.line(),
            message: error.to_string(),
            trace,
        }
    }

    /// Build a report from already-known parts, without touching the stack.
    pub fn from_parts(
        kind: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        ErrorReport {
            kind: kind.into(),
            file: file.into(),
            line,
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<RawFrame>) -> Self {
        self.trace = trace;
        self
    }
}

impl Reportable for ErrorReport {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn file(&self) -> &str {
        &self.file
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn trace(&self) -> Vec<RawFrame> {
        self.trace.clone()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}: {}", self.kind, self.file, self.line, self.message)
    }
}
