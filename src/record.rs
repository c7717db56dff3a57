use crate::environment::EnvironmentSnapshot;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// `type` value used for records built from plain messages.
pub const MESSAGE_TYPE: &str = "Log";

/// Caller-supplied severity.
///
/// The core never interprets the value; sinks decide what it means. The
/// associated constants follow the syslog priority numbering, which is what
/// [`SystemLogSink`](crate::syslog::SystemLogSink) expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl Level {
    pub const EMERGENCY: Level = Level(0);
    pub const ALERT: Level = Level(1);
    pub const CRITICAL: Level = Level(2);
    pub const ERROR: Level = Level(3);
    pub const WARNING: Level = Level(4);
    pub const NOTICE: Level = Level(5);
    pub const INFO: Level = Level(6);
    pub const DEBUG: Level = Level(7);

    pub fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Level {
    fn from(value: i32) -> Self {
        Level(value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One normalized stack frame: only the location survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub file: String,
    pub line: u32,
}

impl TraceFrame {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        TraceFrame { file: file.into(), line }
    }
}

/// Canonical unit produced for every logged event.
///
/// Built once by [`LogRecordBuilder`](crate::builder::LogRecordBuilder),
/// handed by reference to each configured sink and then dropped. Fields are
/// only readable; the fingerprint is computed at construction and always
/// agrees with the identifying fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    url: String,
    #[serde(rename = "type")]
    kind: String,
    source_file: String,
    source_line: u32,
    message: String,
    environment: EnvironmentSnapshot,
    trace: Vec<TraceFrame>,
    level: Level,
    fingerprint: String,
}

impl LogRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        url: String,
        kind: String,
        source_file: String,
        source_line: u32,
        message: String,
        environment: EnvironmentSnapshot,
        trace: Vec<TraceFrame>,
        level: Level,
    ) -> Self {
        let fingerprint = fingerprint(&url, &kind, &source_file, source_line, &message);
        LogRecord {
            url,
            kind,
            source_file,
            source_line,
            message,
            environment,
            trace,
            level,
            fingerprint,
        }
    }

    /// Originating request URI, empty outside a request.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// [`MESSAGE_TYPE`] for messages, the error kind name for errors.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn source_line(&self) -> u32 {
        self.source_line
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn environment(&self) -> &EnvironmentSnapshot {
        &self.environment
    }

    /// Innermost frame first; never contains the logging call itself.
    pub fn trace(&self) -> &[TraceFrame] {
        &self.trace
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Deterministic digest of a record's identifying fields.
///
/// Lowercase hex SHA-256 over the fields joined with `#`. The separator sits
/// between every pair of fields, so two distinct tuples never feed the same
/// bytes into the hash.
pub fn fingerprint(url: &str, kind: &str, source_file: &str, source_line: u32, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"#");
    hasher.update(kind.as_bytes());
    hasher.update(b"#");
    hasher.update(source_file.as_bytes());
    hasher.update(b"#");
    hasher.update(source_line.to_string().as_bytes());
    hasher.update(b"#");
    hasher.update(message.as_bytes());
    format!("{:x}", hasher.finalize())
}
