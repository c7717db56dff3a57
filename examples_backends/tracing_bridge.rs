use std::sync::Arc;

use tracing::{error, info};

use app_log_sink::{backend::sink_from_env, init::init_tracing, logger::Logger};

fn main() {
    // Every `error!` goes through the sink named by LOG_SINK_DSN
    // (default `tracing://`, which just echoes it back to the console).
    let sink = sink_from_env().expect("failed to build log sink");
    let logger = Arc::new(Logger::new(sink));
    init_tracing(logger.clone()).expect("set global subscriber");

    info!("service started");
    error!(order_id = 123, "order failed");

    println!("forwarded {} records", logger.total_records());
}
