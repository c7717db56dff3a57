use std::sync::Arc;

use app_log_sink::{
    logger::Logger,
    record::{Level, LogRecord},
    report::ErrorReport,
    sink::{Sink, SinkError},
};

/// Example of integrating a completely custom backend by implementing
/// the `Sink` trait directly. Imagine this talks to some proprietary
/// store for which this crate does not provide a built-in sink.
struct MyCustomDbSink;

impl Sink for MyCustomDbSink {
    fn write(&self, record: &LogRecord, level: Level) -> Result<(), SinkError> {
        // Here you would call your own client library for the target store.
        // For the sake of example we just print the record.
        println!(
            "[my-custom-db] level={} {}:{} {} ({})",
            level,
            record.source_file(),
            record.source_line(),
            record.message(),
            record.fingerprint()
        );
        Ok(())
    }
}

fn parse_port(raw: &str) -> Result<u16, ErrorReport> {
    raw.parse::<u16>().map_err(|e| ErrorReport::new(&e))
}

fn main() {
    let logger = Logger::new(Arc::new(MyCustomDbSink));

    logger.log_message("custom backend example started", Level::INFO);

    if let Err(report) = parse_port("eighty") {
        logger.log_error(&report, Level::ERROR);
    }
}
