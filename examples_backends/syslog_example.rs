use std::sync::Arc;

use app_log_sink::{
    backend::{make_sink_from_config, parse_dsn},
    logger::Logger,
    record::Level,
};

fn main() {
    // Example DSN: syslog://billing
    // Lines show up as `billing: payment failed` in the system log.
    let dsn = std::env::var("LOG_SINK_DSN").unwrap_or_else(|_| "syslog://billing".to_string());

    let backend_cfg = parse_dsn(&dsn).expect("invalid LOG_SINK_DSN");
    let sink = make_sink_from_config(&backend_cfg).expect("failed to build syslog backend sink");
    let logger = Arc::new(Logger::new(sink));

    logger.log_message("payment failed", Level::ERROR);
}
