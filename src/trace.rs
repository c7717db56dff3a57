use crate::record::TraceFrame;
use std::panic::Location;

/// Symbol fragments identifying the frame of [`Logger::log_message`](crate::logger::Logger::log_message).
pub(crate) const LOGGER_ENTRY_FRAME: &[&str] = &["logger::Logger", "::log_message"];

/// Symbol fragments identifying the frame of [`ErrorReport::new`](crate::report::ErrorReport::new).
pub(crate) const REPORT_ENTRY_FRAME: &[&str] = &["report::ErrorReport", "::new"];

// Frames at and beyond these belong to the Rust runtime, not the program.
const RUNTIME_BOUNDARIES: &[&str] = &["__rust_begin_short_backtrace", "std::rt::lang_start"];

/// A call-stack frame as the ambient context reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub function: Option<String>,
    pub file: String,
    pub line: u32,
}

impl RawFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        RawFrame { function: None, file: file.into(), line }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

impl From<&Location<'_>> for RawFrame {
    fn from(location: &Location<'_>) -> Self {
        RawFrame::new(location.file(), location.line())
    }
}

/// Reduce a raw stack to its `(file, line)` pairs, keeping order.
pub fn normalize<I>(frames: I) -> Vec<TraceFrame>
where
    I: IntoIterator<Item = RawFrame>,
{
    frames
        .into_iter()
        .map(|frame| TraceFrame { file: frame.file, line: frame.line })
        .collect()
}

/// Capture the live stack starting at the outermost frame whose symbol
/// contains every fragment of `entry`.
///
/// Frames without file/line debug info are skipped and the walk stops at the
/// runtime entry point. Returns an empty stack when `entry` is not found,
/// e.g. because the entry function was inlined.
pub(crate) fn capture_stack(entry: &[&str]) -> Vec<RawFrame> {
    let backtrace = backtrace::Backtrace::new();

    let symbols: Vec<(Option<String>, Option<RawFrame>)> = backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(|symbol| {
            let name = symbol.name().map(|name| format!("{:#}", name));
            let location = match (symbol.filename(), symbol.lineno()) {
                (Some(file), Some(line)) => Some(RawFrame {
                    function: name.clone(),
                    file: file.to_string_lossy().into_owned(),
                    line,
                }),
                _ => None,
            };
            (name, location)
        })
        .collect();

    let Some(start) = symbols
        .iter()
        .rposition(|(name, _)| {
            name.as_deref()
                .is_some_and(|name| entry.iter().all(|fragment| name.contains(fragment)))
        })
    else {
        return Vec::new();
    };

    symbols[start..]
        .iter()
        .take_while(|(name, _)| {
            !name
                .as_deref()
                .is_some_and(|name| RUNTIME_BOUNDARIES.iter().any(|boundary| name.contains(boundary)))
        })
        .filter_map(|(_, location)| location.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_keeps_only_locations_in_order() {
        let frames = vec![
            RawFrame::new("a.rs", 10).with_function("log_call"),
            RawFrame::new("b.rs", 42).with_function("caller"),
            RawFrame::new("c.rs", 5).with_function("main"),
        ];
        assert_eq!(
            normalize(frames),
            vec![TraceFrame::new("a.rs", 10), TraceFrame::new("b.rs", 42), TraceFrame::new("c.rs", 5)]
        );
    }

    #[test]
    fn normalize_empty_stack() {
        assert!(normalize(Vec::new()).is_empty());
    }

    #[test]
    fn capture_without_entry_frame_is_empty() {
        assert!(capture_stack(&["no_such_module", "::no_such_function"]).is_empty());
    }

    #[test]
    fn raw_frame_from_location() {
        let location = Location::caller();
        let frame = RawFrame::from(location);
        assert_eq!(frame.file, location.file());
        assert_eq!(frame.line, location.line());
        assert!(frame.function.is_none());
    }
}
