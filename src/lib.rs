//! Synchronous logging facade routing caught errors and plain messages to
//! pluggable sinks.
//!
//! A [`Logger`](logger::Logger) turns each call into a
//! [`LogRecord`](record::LogRecord) (location, fingerprint, environment,
//! trace) and hands it to its [`Sink`](sink::Sink)s on the calling thread.
//! Sink failures never reach the caller.

pub mod record;
pub mod environment;
pub mod context;
pub mod trace;
pub mod report;
pub mod builder;
pub mod sink;
pub mod logger;

pub mod database;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod syslog;
pub mod noop_sink;
pub mod tracing_sink;

pub mod layer;
pub mod init;
pub mod backend;
pub mod env;
