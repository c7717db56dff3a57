use app_log_sink::{
    backend::{make_sink_from_config, parse_dsn},
    logger::Logger,
    record::Level,
};

fn main() {
    // Example DSN: sqlite://app_logs.db?table=events&create_tables=true
    // Rows land in `events__<YYYY_MM_DD>` (daily rotation by default).
    let dsn = std::env::var("LOG_SINK_DSN")
        .unwrap_or_else(|_| "sqlite://app_logs.db?table=events&create_tables=true".to_string());

    let backend_cfg = parse_dsn(&dsn).expect("invalid LOG_SINK_DSN");
    let sink = make_sink_from_config(&backend_cfg).expect("failed to build sqlite backend sink");
    let logger = Logger::new(sink);

    logger.log_message("sqlite backend example started", Level::INFO);
    logger.log_message("disk full", Level::ERROR);

    println!(
        "logged {} records, {} dropped",
        logger.total_records(),
        logger.dropped_records()
    );
}
