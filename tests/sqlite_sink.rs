#![cfg(feature = "sqlite")]

use std::sync::Arc;

use app_log_sink::context::StaticContext;
use app_log_sink::database::{DatabaseConfig, DatabaseSink};
use app_log_sink::logger::Logger;
use app_log_sink::record::{Level, TraceFrame};
use app_log_sink::report::ErrorReport;
use app_log_sink::sqlite::SqliteConnection;
use app_log_sink::trace::RawFrame;
use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use serde_json::json;

fn jan_15() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap()
}

fn request_context() -> Arc<StaticContext> {
    Arc::new(
        StaticContext::new()
            .with_uri("/orders/17")
            .with_query("expand", json!("items"))
            .with_call_stack(vec![
                RawFrame::new("src/logger.rs", 10),
                RawFrame::new("src/orders.rs", 42),
                RawFrame::new("src/main.rs", 5),
            ]),
    )
}

type Row = (String, i64, String, String, String, i64, String, String, String);

fn rows(connection: &SqliteConnection, table: &str) -> Vec<Row> {
    let sql = format!(
        "SELECT fingerprint, level, url, type, file, line, message, environment, trace FROM {table} ORDER BY id"
    );
    connection
        .block_on(sqlx::query_as::<_, Row>(&sql).fetch_all(connection.pool()))
        .unwrap()
}

#[test]
fn message_lands_in_rotated_table() {
    let connection = SqliteConnection::connect("sqlite::memory:").unwrap();
    let config = DatabaseConfig::new("events").with_create_tables(true);
    let sink = DatabaseSink::with_clock(config, Arc::new(connection.clone()), jan_15).unwrap();
    let logger = Logger::new(Arc::new(sink)).with_context(request_context());

    logger.log_message("disk full", 3);

    let rows = rows(&connection, "events__2024_01_15");
    assert_eq!(rows.len(), 1);
    let (fingerprint, level, url, kind, file, line, message, environment, trace) = &rows[0];
    assert_eq!(fingerprint.len(), 64);
    assert_eq!(*level, 3);
    assert_eq!(url, "/orders/17");
    assert_eq!(kind, "Log");
    assert_eq!(file, "src/orders.rs");
    assert_eq!(*line, 42);
    assert_eq!(message, "disk full");

    let environment: serde_json::Value = serde_json::from_str(environment).unwrap();
    assert_eq!(environment["get"], json!({"expand": "items"}));
    assert_eq!(environment["session"], json!({}));

    let trace: Vec<TraceFrame> = serde_json::from_str(trace).unwrap();
    assert_eq!(trace, vec![TraceFrame::new("src/orders.rs", 42), TraceFrame::new("src/main.rs", 5)]);
    assert_eq!(logger.dropped_records(), 0);
}

#[test]
fn repeated_errors_share_fingerprint() {
    let connection = SqliteConnection::connect("sqlite::memory:").unwrap();
    let config = DatabaseConfig::new("errors").with_rotation(None).with_create_tables(true);
    let sink = DatabaseSink::new(config, Arc::new(connection.clone())).unwrap();
    let logger = Logger::new(Arc::new(sink)).with_context(request_context());
    let report = ErrorReport::from_parts("PaymentError", "src/pay.rs", 88, "card declined");

    logger.log_error(&report, Level::ERROR);
    logger.log_error(&report, Level::CRITICAL);

    let rows = rows(&connection, "errors");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, rows[1].0);
    assert_eq!((rows[0].1, rows[1].1), (3, 2));
    assert_eq!(rows[0].3, "PaymentError");
    assert_eq!(rows[0].4, "src/pay.rs");
    assert_eq!(rows[0].5, 88);

    let stamped: (i64,) = connection
        .block_on(
            sqlx::query_as("SELECT COUNT(*) FROM errors WHERE date_added IS NOT NULL").fetch_one(connection.pool()),
        )
        .unwrap();
    assert_eq!(stamped.0, 2);
}

#[test]
fn missing_table_drops_record_silently() {
    let connection = SqliteConnection::connect("sqlite::memory:").unwrap();
    let config = DatabaseConfig::new("absent").with_rotation(None);
    let sink = DatabaseSink::new(config, Arc::new(connection)).unwrap();
    let logger = Logger::new(Arc::new(sink)).with_context(request_context());

    logger.log_message("nowhere to go", Level::WARNING);

    assert_eq!(logger.total_records(), 1);
    assert_eq!(logger.dropped_records(), 1);
}
