use std::sync::Arc;

use tracing::debug;

use crate::database::{DatabaseConfig, StorageError};
use crate::env::{env_or, DEFAULT_DSN, LOG_SINK_DSN_ENV};
use crate::noop_sink::NoopSink;
use crate::sink::{Sink, SinkError};
use crate::tracing_sink::TracingSink;

/// Supported backend kinds that can be selected via DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    Syslog,
    Tracing,
    Noop,
}

/// Backend configuration built from a DSN.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Selected backend implementation.
    pub kind: BackendKind,
    /// Raw DSN that was used to construct this config.
    pub dsn: String,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, dsn: impl Into<String>) -> Self {
        BackendConfig { kind, dsn: dsn.into() }
    }
}

/// Parse a DSN string and infer the backend kind from its scheme.
///
/// Examples:
/// - "sqlite://var/log/app.db?table=events&rotation=%25Y_%25m"
/// - "sqlite://:memory:?table=events&rotation=&create_tables=true"
/// - "syslog://billing"
/// - "tracing://"
/// - "noop://"
pub fn parse_dsn(dsn: &str) -> Result<BackendConfig, DsnError> {
    let lower = dsn.to_ascii_lowercase();

    if lower.starts_with("sqlite://") || lower.starts_with("sqlite::") {
        Ok(BackendConfig::new(BackendKind::Sqlite, dsn))
    } else if lower.starts_with("syslog://") {
        Ok(BackendConfig::new(BackendKind::Syslog, dsn))
    } else if lower.starts_with("tracing://") {
        Ok(BackendConfig::new(BackendKind::Tracing, dsn))
    } else if lower.starts_with("noop://") {
        Ok(BackendConfig::new(BackendKind::Noop, dsn))
    } else {
        Err(DsnError::UnknownScheme)
    }
}

/// Error type returned when parsing a DSN.
#[derive(thiserror::Error, Debug)]
pub enum DsnError {
    #[error("unknown or unsupported DSN scheme")]
    UnknownScheme,

    #[error("invalid DSN option: {0}")]
    InvalidOption(String),

    #[error("syslog DSN is missing the application name")]
    MissingApplicationName,
}

/// Split a SQLite DSN into the database URL and the sink configuration.
///
/// Recognized query options: `table` (default `logs`), `rotation` (a
/// url-encoded strftime pattern, default daily, empty disables rotation)
/// and `create_tables` (`true`/`false`, default `false`).
pub fn database_config_from_dsn(dsn: &str) -> Result<(String, DatabaseConfig), DsnError> {
    let (base, query) = dsn.split_once('?').unwrap_or((dsn, ""));
    let url = match base {
        "sqlite://:memory:" | "sqlite::memory:" => "sqlite::memory:".to_string(),
        other => other.to_string(),
    };

    let mut config = DatabaseConfig::default();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value).map_err(|_| DsnError::InvalidOption(pair.to_string()))?;
        match key {
            "table" => config.table = value.into_owned(),
            "rotation" => config = config.with_rotation(Some(value.as_ref())),
            "create_tables" => {
                config.create_tables = match value.as_ref() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    _ => return Err(DsnError::InvalidOption(pair.to_string())),
                }
            }
            _ => return Err(DsnError::InvalidOption(pair.to_string())),
        }
    }

    Ok((url, config))
}

/// Error type returned when building a backend sink from configuration.
#[derive(thiserror::Error, Debug)]
pub enum BackendBuildError {
    #[error(transparent)]
    Dsn(#[from] DsnError),

    #[error("sqlite feature is not enabled")]
    SqliteFeatureDisabled,

    #[error("backend not available on this platform: {0:?}")]
    Unsupported(BackendKind),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Create a concrete [`Sink`] implementation from a [`BackendConfig`].
///
/// This is the main entry point for applications that want to select
/// a backend using a single DSN string instead of constructing sinks
/// manually.
pub fn make_sink_from_config(cfg: &BackendConfig) -> Result<Arc<dyn Sink>, BackendBuildError> {
    debug!(kind = ?cfg.kind, "building log sink");
    match cfg.kind {
        BackendKind::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                use crate::database::DatabaseSink;
                use crate::sqlite::SqliteConnection;

                let (url, config) = database_config_from_dsn(&cfg.dsn)?;
                let connection = SqliteConnection::connect(&url)?;
                let sink = DatabaseSink::new(config, Arc::new(connection))?;
                Ok(Arc::new(sink) as Arc<dyn Sink>)
            }

            #[cfg(not(feature = "sqlite"))]
            {
                let _ = cfg;
                Err(BackendBuildError::SqliteFeatureDisabled)
            }
        }
        BackendKind::Syslog => {
            let name = cfg.dsn.get("syslog://".len()..).unwrap_or_default();
            let name = urlencoding::decode(name)
                .map_err(|_| DsnError::InvalidOption(name.to_string()))?
                .into_owned();
            if name.is_empty() {
                return Err(DsnError::MissingApplicationName.into());
            }

            #[cfg(unix)]
            {
                use crate::syslog::SystemLogSink;

                Ok(Arc::new(SystemLogSink::new(name)) as Arc<dyn Sink>)
            }

            #[cfg(not(unix))]
            {
                let _ = name;
                Err(BackendBuildError::Unsupported(BackendKind::Syslog))
            }
        }
        BackendKind::Tracing => Ok(Arc::new(TracingSink) as Arc<dyn Sink>),
        BackendKind::Noop => Ok(Arc::new(NoopSink) as Arc<dyn Sink>),
    }
}

/// Build the sink named by the `LOG_SINK_DSN` environment variable,
/// falling back to `tracing://`.
pub fn sink_from_env() -> Result<Arc<dyn Sink>, BackendBuildError> {
    let dsn = env_or(LOG_SINK_DSN_ENV, DEFAULT_DSN);
    let cfg = parse_dsn(&dsn)?;
    make_sink_from_config(&cfg)
}
