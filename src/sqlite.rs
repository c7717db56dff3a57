use crate::database::{Connection, Params, PreparedStatement, SqlValue, StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// SQLite storage for [`DatabaseSink`](crate::database::DatabaseSink) on top of `sqlx`.
///
/// The connection owns a current-thread Tokio runtime and blocks on it for
/// every statement, so it can be used from plain synchronous code. It must
/// not be called from inside another Tokio runtime; the resulting panic is
/// absorbed by the logger like any other sink failure.
#[derive(Clone)]
pub struct SqliteConnection {
    runtime: Arc<Runtime>,
    pool: SqlitePool,
}

impl SqliteConnection {
    /// Connect to `url` (`sqlite://path/to/file.db`, `sqlite::memory:`).
    ///
    /// The database file is created if missing. The pool holds a single
    /// connection that is never recycled, which keeps in-memory databases
    /// alive for the lifetime of this value.
    pub fn connect(url: &str) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .create_if_missing(true);

        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options),
            )
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(SqliteConnection { runtime: Arc::new(runtime), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a future on this connection's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl Connection for SqliteConnection {
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>, StorageError> {
        let (sql, names) = positional(sql);
        Ok(Box::new(SqliteStatement { connection: self.clone(), sql, names }))
    }
}

struct SqliteStatement {
    connection: SqliteConnection,
    sql: String,
    names: Vec<String>,
}

impl PreparedStatement for SqliteStatement {
    fn execute(&mut self, params: &Params) -> Result<(), StorageError> {
        let mut query = sqlx::query(&self.sql);
        for name in &self.names {
            query = match params.get(name) {
                Some(SqlValue::Text(text)) => query.bind(text.clone()),
                Some(SqlValue::Integer(value)) => query.bind(*value),
                None => return Err(StorageError::Execute(format!("missing parameter :{name}"))),
            };
        }

        self.connection
            .block_on(query.execute(self.connection.pool()))
            .map_err(|e| StorageError::Execute(e.to_string()))?;
        Ok(())
    }
}

/// Rewrite `:name` placeholders to `?`, returning the names in bind order.
/// Quoted literals are left untouched.
fn positional(sql: &str) -> (String, Vec<String>) {
    let mut out = String::with_capacity(sql.len());
    let mut names = Vec::new();
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
            continue;
        }
        let starts_name = chars.peek().is_some_and(|next| next.is_ascii_alphabetic() || *next == '_');
        if c == ':' && !in_literal && starts_name {
            let mut name = String::new();
            while let Some(next) = chars.peek().copied() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            names.push(name);
            out.push('?');
        } else {
            out.push(c);
        }
    }

    (out, names)
}
