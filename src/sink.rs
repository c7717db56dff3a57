use crate::database::StorageError;
use crate::record::{Level, LogRecord};

/// Destination for [`LogRecord`]s produced by a [`Logger`](crate::logger::Logger).
///
/// Implementations move records to a concrete backend (SQL table, syslog,
/// `tracing`, ...). The logger calls `write` synchronously on the logging
/// thread and discards whatever it returns, so an error here only means the
/// record was dropped.
pub trait Sink: Send + Sync {
    /// Write a single record.
    ///
    /// **Parameters**
    /// - `record`: fully-populated [`LogRecord`] built for this event.
    /// - `level`: caller-supplied severity, equal to `record.level()`.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the record.
    /// - `Err(..)` on any transport or serialization failure. There is no
    ///   retry.
    fn write(&self, record: &LogRecord, level: Level) -> Result<(), SinkError>;
}

/// Failure inside a sink.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("invalid rotation pattern: {0:?}")]
    InvalidRotationPattern(String),
}
