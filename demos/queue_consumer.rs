use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};
use tracing_log_relay::{
    config::LoggingConfig,
    drain::{spawn_drain, DrainConfig},
    init::init_logging,
    record::LogRecord,
    registry::HandlerRegistry,
    sink::{LogSink, SinkError},
};

/// Stand-in for an exporter or UI that consumes queued records.
struct PrintSink;

#[async_trait]
impl LogSink for PrintSink {
    async fn send(&self, record: &LogRecord) -> Result<(), SinkError> {
        println!("[consumer] {}", serde_json::to_string(record)?);
        Ok(())
    }
}

const CONFIG: &str = r#"
[logging]
level = "DEBUG"
format = "{timestamp} {level} {source}: {message} {metadata}"

[logging.filters."queue_consumer\\.db"]
level = "WARN"

[[logging.handlers]]
type = "console"
level = "INFO"

[[logging.handlers]]
type = "queued"
"#;

#[tokio::main]
async fn main() {
    let mut config = LoggingConfig::from_toml_str(CONFIG).expect("parse logging config");
    config.apply_env();
    let handles = init_logging(&config, &HandlerRegistry::default()).expect("install logging");

    let drain = spawn_drain(handles.queue.clone(), Arc::new(PrintSink), DrainConfig::default());

    handles.context.set("service", "billing");
    info!(target: "queue_consumer.http", path = "/invoices", "request served");
    debug!(target: "queue_consumer.db", "suppressed by source rule");
    warn!(target: "queue_consumer.db", elapsed_ms = 812, "slow query");

    handles.context.set("request_id", "r-42");
    error!(target: "queue_consumer.http", status = 502, "upstream failed");

    sleep(Duration::from_millis(500)).await;
    drain.shutdown().await.expect("drain task");
}
