//! Environment variable names used by this crate for configuring a sink
//! without code changes.
//!
//! These are purely helpers; the sink types themselves never read the
//! environment.

/// DSN selecting the backend, see [`parse_dsn`](crate::backend::parse_dsn).
pub const LOG_SINK_DSN_ENV: &str = "LOG_SINK_DSN";

/// DSN used when [`LOG_SINK_DSN_ENV`] is not set.
pub const DEFAULT_DSN: &str = "tracing://";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
