use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_log_relay::config::{HandlerConfig, HandlerKind, LoggingConfig};
use tracing_log_relay::drain::{spawn_drain, DrainConfig};
use tracing_log_relay::init::init_logging;
use tracing_log_relay::noop_sink::NoopSink;
use tracing_log_relay::registry::HandlerRegistry;

#[tokio::main]
async fn main() {
    let mut config = LoggingConfig::default();
    config.handlers.push(HandlerConfig::new(HandlerKind::Queued));
    let handles = init_logging(&config, &HandlerRegistry::default()).expect("install logging");
    handles.context.set("run", "load");

    let sink = Arc::new(NoopSink::default());
    let drain = spawn_drain(
        handles.queue.clone(),
        sink.clone(),
        DrainConfig {
            batch_size: 1_000,
            poll_interval: Duration::from_millis(20),
            ..DrainConfig::default()
        },
    );

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "queue load test error");
    }

    let elapsed = start.elapsed();
    println!("queued {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give the drain task a little time to catch up
    sleep(Duration::from_secs(1)).await;
    drain.shutdown().await.expect("drain task");
    println!("sink received {} records", sink.received());
}
