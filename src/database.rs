use crate::record::{Level, LogRecord};
use crate::sink::{Sink, SinkError};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Named-parameter binding, keyed without the leading `:`.
pub type Params = BTreeMap<String, SqlValue>;

/// Value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

/// Error reported by the storage collaborator.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to prepare statement: {0}")]
    Prepare(String),

    #[error("failed to execute statement: {0}")]
    Execute(String),
}

/// Storage service able to prepare parameterized SQL.
///
/// Placeholders are written `:name`; [`PreparedStatement::execute`] binds
/// them from a [`Params`] map. Timeouts and reconnects are the
/// implementation's business.
pub trait Connection: Send + Sync {
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, StorageError>;
}

pub trait PreparedStatement: Send {
    fn execute(&mut self, params: &Params) -> Result<(), StorageError>;
}

/// Configuration for [`DatabaseSink`].
///
/// **Fields**
/// - `table`: base table name, a plain SQL identifier.
/// - `rotation`: `chrono` strftime pattern; the formatted current date is
///   appended as `<table>__<suffix>`. `None` or an empty pattern writes to
///   `table` itself.
/// - `create_tables`: issue [`create_table_statements`] before the first
///   insert into each resolved table.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub table: String,
    pub rotation: Option<String>,
    pub create_tables: bool,
}

/// Daily rotation, `events` becomes `events__2024_01_15`.
pub const DAILY_ROTATION: &str = "%Y_%m_%d";

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            table: "logs".to_string(),
            rotation: Some(DAILY_ROTATION.to_string()),
            create_tables: false,
        }
    }
}

impl DatabaseConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), ..Self::default() }
    }

    pub fn with_rotation(mut self, rotation: Option<&str>) -> Self {
        self.rotation = rotation.filter(|pattern| !pattern.is_empty()).map(str::to_string);
        self
    }

    pub fn with_create_tables(mut self, create_tables: bool) -> Self {
        self.create_tables = create_tables;
        self
    }
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

struct ActiveStatement {
    table: String,
    statement: Box<dyn PreparedStatement>,
}

/// Persists records as rows of a (possibly date-rotated) SQL table.
///
/// The insert statement is prepared at construction against the table of
/// the current rotation period. Each write re-resolves the table name and
/// prepares a new statement when the period has changed, so a long-lived
/// sink follows the rotation instead of writing to a stale table.
pub struct DatabaseSink {
    connection: Arc<dyn Connection>,
    config: DatabaseConfig,
    clock: Clock,
    active: Mutex<ActiveStatement>,
}

impl DatabaseSink {
    /// Construct a sink that resolves rotation against local time.
    ///
    /// **Returns**
    /// - `Err(InvalidTableName | InvalidRotationPattern)` on bad config.
    /// - `Err(Storage(..))` if the first statement could not be prepared.
    pub fn new(config: DatabaseConfig, connection: Arc<dyn Connection>) -> Result<Self, SinkError> {
        Self::with_clock(config, connection, || Local::now().naive_local())
    }

    pub fn with_clock<F>(config: DatabaseConfig, connection: Arc<dyn Connection>, clock: F) -> Result<Self, SinkError>
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        let rotation = config.rotation.clone();
        let config = config.with_rotation(rotation.as_deref());
        if let Some(pattern) = &config.rotation {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(SinkError::InvalidRotationPattern(pattern.clone()));
            }
        }
        validate_identifier(&config.table)?;

        let table = resolve_table(&config, clock())?;
        let statement = prepare_for(connection.as_ref(), &config, &table)?;

        Ok(DatabaseSink {
            connection,
            config,
            clock: Box::new(clock),
            active: Mutex::new(ActiveStatement { table, statement }),
        })
    }

    /// Physical table the next write would go to.
    pub fn current_table(&self) -> Result<String, SinkError> {
        resolve_table(&self.config, (self.clock)())
    }
}

impl Sink for DatabaseSink {
    fn write(&self, record: &LogRecord, level: Level) -> Result<(), SinkError> {
        let table = self.current_table()?;
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.table != table {
            debug!(from = %active.table, to = %table, "rotating log table");
            let statement = prepare_for(self.connection.as_ref(), &self.config, &table)?;
            *active = ActiveStatement { table, statement };
        }

        let params = insert_params(record, level)?;
        active.statement.execute(&params)?;
        Ok(())
    }
}

// Zone items (%Z, %z) parse but cannot format a NaiveDateTime.
fn resolve_table(config: &DatabaseConfig, now: NaiveDateTime) -> Result<String, SinkError> {
    let Some(pattern) = &config.rotation else {
        return Ok(config.table.clone());
    };
    let mut table = format!("{}__", config.table);
    write!(table, "{}", now.format(pattern)).map_err(|_| SinkError::InvalidRotationPattern(pattern.clone()))?;
    Ok(table)
}

fn validate_identifier(name: &str) -> Result<(), SinkError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SinkError::InvalidTableName(name.to_string()))
    }
}

fn prepare_for(
    connection: &dyn Connection,
    config: &DatabaseConfig,
    table: &str,
) -> Result<Box<dyn PreparedStatement>, SinkError> {
    validate_identifier(table)?;
    if config.create_tables {
        for ddl in create_table_statements(table) {
            connection.prepare(&ddl)?.execute(&Params::new())?;
        }
    }
    debug!(table, "preparing log insert statement");
    Ok(connection.prepare(&insert_statement(table))?)
}

/// Parameterized insert for one record into `table`.
///
/// The record's source file and line are bound as `:source_file` and
/// `:source_line` and land in the `file` and `line` columns.
pub fn insert_statement(table: &str) -> String {
    format!(
        "INSERT INTO {table} \
         (fingerprint, level, url, type, file, line, message, environment, trace) \
         VALUES \
         (:fingerprint, :level, :url, :type, :source_file, :source_line, :message, :environment, :trace)"
    )
}

/// DDL for the table layout [`DatabaseSink`] writes to (SQLite dialect).
pub fn create_table_statements(table: &str) -> [String; 2] {
    [
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fingerprint CHAR(64) NOT NULL,
                level SMALLINT UNSIGNED NOT NULL,
                url VARCHAR(255) NOT NULL,
                type VARCHAR(255) NOT NULL,
                file VARCHAR(255) NOT NULL,
                line INTEGER UNSIGNED NOT NULL,
                message TEXT NOT NULL,
                environment TEXT NOT NULL,
                trace TEXT NOT NULL,
                date_added TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS {table}_fingerprint ON {table} (fingerprint)"),
    ]
}

fn insert_params(record: &LogRecord, level: Level) -> Result<Params, SinkError> {
    let mut params = Params::new();
    params.insert("fingerprint".into(), record.fingerprint().into());
    params.insert("level".into(), i64::from(level.value()).into());
    params.insert("url".into(), record.url().into());
    params.insert("type".into(), record.kind().into());
    params.insert("source_file".into(), record.source_file().into());
    params.insert("source_line".into(), i64::from(record.source_line()).into());
    params.insert("message".into(), record.message().into());
    params.insert("environment".into(), serde_json::to_string(record.environment())?.into());
    params.insert("trace".into(), serde_json::to_string(record.trace())?.into());
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LogRecordBuilder;
    use crate::context::StaticContext;
    use crate::logger::Logger;
    use crate::record::TraceFrame;
    use crate::trace::RawFrame;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Journal {
        prepared: Vec<String>,
        executed: Vec<(String, Params)>,
    }

    #[derive(Default)]
    struct RecordingConnection {
        journal: Arc<Mutex<Journal>>,
        fail_execute: bool,
    }

    struct RecordingStatement {
        sql: String,
        journal: Arc<Mutex<Journal>>,
        fail: bool,
    }

    impl Connection for RecordingConnection {
        fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, StorageError> {
            self.journal.lock().unwrap().prepared.push(sql.to_string());
            Ok(Box::new(RecordingStatement {
                sql: sql.to_string(),
                journal: self.journal.clone(),
                fail: self.fail_execute,
            }))
        }
    }

    impl PreparedStatement for RecordingStatement {
        fn execute(&mut self, params: &Params) -> Result<(), StorageError> {
            if self.fail {
                return Err(StorageError::Connection("server has gone away".into()));
            }
            self.journal.lock().unwrap().executed.push((self.sql.clone(), params.clone()));
            Ok(())
        }
    }

    fn jan_15() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn jan_16() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 16).unwrap().and_hms_opt(0, 0, 1).unwrap()
    }

    fn sample_record() -> LogRecord {
        let context = StaticContext::new()
            .with_uri("/orders")
            .with_call_stack(vec![RawFrame::new("a.rs", 10), RawFrame::new("b.rs", 42)]);
        LogRecordBuilder::new(Arc::new(context)).build_from_message("disk full", Level(3))
    }

    #[test]
    fn inserts_into_rotated_table() {
        let connection = Arc::new(RecordingConnection::default());
        let journal = connection.journal.clone();
        let sink = DatabaseSink::with_clock(DatabaseConfig::new("events"), connection, jan_15).unwrap();

        sink.write(&sample_record(), Level(3)).unwrap();

        let journal = journal.lock().unwrap();
        assert_eq!(journal.prepared, vec![insert_statement("events__2024_01_15")]);
        assert!(journal.executed[0].0.starts_with("INSERT INTO events__2024_01_15 "));
    }

    #[test]
    fn binds_every_parameter() {
        let connection = Arc::new(RecordingConnection::default());
        let journal = connection.journal.clone();
        let sink = DatabaseSink::with_clock(DatabaseConfig::new("events"), connection, jan_15).unwrap();
        let record = sample_record();

        sink.write(&record, Level(3)).unwrap();

        let journal = journal.lock().unwrap();
        let params = &journal.executed[0].1;
        assert_eq!(params.len(), 9);
        assert_eq!(params["fingerprint"], SqlValue::Text(record.fingerprint().to_string()));
        assert_eq!(params["level"], SqlValue::Integer(3));
        assert_eq!(params["url"], SqlValue::from("/orders"));
        assert_eq!(params["type"], SqlValue::from("Log"));
        assert_eq!(params["source_file"], SqlValue::from("b.rs"));
        assert_eq!(params["source_line"], SqlValue::Integer(42));
        assert_eq!(params["message"], SqlValue::from("disk full"));

        let SqlValue::Text(trace) = &params["trace"] else { panic!("trace is not text") };
        let trace: Vec<TraceFrame> = serde_json::from_str(trace).unwrap();
        assert_eq!(trace, vec![TraceFrame::new("b.rs", 42)]);

        let SqlValue::Text(environment) = &params["environment"] else { panic!("environment is not text") };
        let environment: serde_json::Value = serde_json::from_str(environment).unwrap();
        assert_eq!(environment["session"], serde_json::json!({}));
    }

    #[test]
    fn no_rotation_uses_base_table() {
        for rotation in [None, Some("")] {
            let connection = Arc::new(RecordingConnection::default());
            let journal = connection.journal.clone();
            let config = DatabaseConfig::new("events").with_rotation(rotation);
            let sink = DatabaseSink::with_clock(config, connection, jan_15).unwrap();

            assert_eq!(sink.current_table().unwrap(), "events");
            assert_eq!(journal.lock().unwrap().prepared, vec![insert_statement("events")]);
        }
    }

    #[test]
    fn follows_rotation_boundary() {
        let connection = Arc::new(RecordingConnection::default());
        let journal = connection.journal.clone();
        let next_day = Arc::new(AtomicBool::new(false));
        let flag = next_day.clone();
        let sink = DatabaseSink::with_clock(DatabaseConfig::new("events"), connection, move || {
            if flag.load(Ordering::SeqCst) {
                jan_16()
            } else {
                jan_15()
            }
        })
        .unwrap();

        sink.write(&sample_record(), Level(3)).unwrap();
        next_day.store(true, Ordering::SeqCst);
        sink.write(&sample_record(), Level(3)).unwrap();
        sink.write(&sample_record(), Level(3)).unwrap();

        let journal = journal.lock().unwrap();
        assert_eq!(
            journal.prepared,
            vec![insert_statement("events__2024_01_15"), insert_statement("events__2024_01_16")]
        );
        let tables: Vec<bool> = journal
            .executed
            .iter()
            .map(|(sql, _)| sql.contains("events__2024_01_16"))
            .collect();
        assert_eq!(tables, vec![false, true, true]);
    }

    #[test]
    fn creates_tables_when_asked() {
        let connection = Arc::new(RecordingConnection::default());
        let journal = connection.journal.clone();
        let config = DatabaseConfig::new("events").with_rotation(None).with_create_tables(true);
        DatabaseSink::with_clock(config, connection, jan_15).unwrap();

        let journal = journal.lock().unwrap();
        assert_eq!(journal.prepared.len(), 3);
        assert!(journal.prepared[0].starts_with("CREATE TABLE IF NOT EXISTS events ("));
        assert!(journal.prepared[1].contains("ON events (fingerprint)"));
        assert_eq!(journal.executed.len(), 2);
    }

    #[test]
    fn rejects_bad_configuration() {
        let connection: Arc<dyn Connection> = Arc::new(RecordingConnection::default());

        let bad_table = DatabaseSink::with_clock(DatabaseConfig::new("logs; DROP TABLE x"), connection.clone(), jan_15);
        assert!(matches!(bad_table, Err(SinkError::InvalidTableName(_))));

        let bad_pattern = DatabaseConfig::new("events").with_rotation(Some("Y_m_%"));
        let bad_pattern = DatabaseSink::with_clock(bad_pattern, connection.clone(), jan_15);
        assert!(matches!(bad_pattern, Err(SinkError::InvalidRotationPattern(_))));

        let unsafe_suffix = DatabaseConfig::new("events").with_rotation(Some("%Y-%m-%d"));
        let unsafe_suffix = DatabaseSink::with_clock(unsafe_suffix, connection, jan_15);
        assert!(matches!(unsafe_suffix, Err(SinkError::InvalidTableName(name)) if name == "events__2024-01-15"));
    }

    #[test]
    fn zone_items_are_rejected_as_rotation() {
        for pattern in ["%Z", "%z", "%:z", "%Y_%m_%d_%Z"] {
            let connection = Arc::new(RecordingConnection::default());
            let journal = connection.journal.clone();
            let config = DatabaseConfig::new("events").with_rotation(Some(pattern));
            let sink = DatabaseSink::with_clock(config, connection, jan_15);
            assert!(
                matches!(&sink, Err(SinkError::InvalidRotationPattern(p)) if p == pattern),
                "{pattern}"
            );
            assert!(journal.lock().unwrap().prepared.is_empty());
        }
    }

    #[test]
    fn execution_failure_is_reported_to_logger_only() {
        let connection = Arc::new(RecordingConnection { fail_execute: true, ..Default::default() });
        let sink = DatabaseSink::with_clock(DatabaseConfig::new("events"), connection, jan_15).unwrap();

        assert!(matches!(sink.write(&sample_record(), Level(3)), Err(SinkError::Storage(_))));

        let logger = Logger::new(Arc::new(sink));
        logger.log_message("disk full", Level(3));
        assert_eq!(logger.dropped_records(), 1);
    }
}
