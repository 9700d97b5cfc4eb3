use std::sync::Arc;
use std::thread;

use tracing::Dispatch;
use tracing_log_relay::config::LoggingConfig;
use tracing_log_relay::init::build_pipeline;
use tracing_log_relay::layer::PipelineLayer;
use tracing_log_relay::queue::RecordQueue;
use tracing_log_relay::registry::HandlerRegistry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

const CONFIG: &str = r#"
[logging]
level = "DEBUG"

[logging.filters."pipeline\\.noisy\\..*"]
level = "ERROR"

[logging.filters."pipeline.exact"]
level = "WARN"
regex = false

[[logging.handlers]]
type = "queued"
"#;

fn dispatch_for(config: &LoggingConfig) -> (Dispatch, tracing_log_relay::init::BuiltPipeline) {
    let mut built = build_pipeline(config, &HandlerRegistry::default(), RecordQueue::new()).unwrap();
    let pipeline = std::mem::take(&mut built.pipeline);
    let layer = PipelineLayer::new(Arc::new(pipeline), built.min_severity);
    (Dispatch::new(Registry::default().with(layer)), built)
}

#[test]
fn concurrent_producers_reach_the_queue_filtered_and_annotated() {
    let config = LoggingConfig::from_toml_str(CONFIG).unwrap();
    let (dispatch, built) = dispatch_for(&config);
    built.context.set("deployment", "blue");

    let threads = 6;
    let per_thread = 200;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let dispatch = dispatch.clone();
            thread::spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    for i in 0..per_thread {
                        tracing::info!(target: "pipeline.worker", thread = t, seq = i, "tick");
                        tracing::warn!(target: "pipeline.noisy.cache", thread = t, "dropped");
                    }
                });
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let records: Vec<_> = built.queue.drain().collect();
    assert_eq!(records.len(), threads * per_thread);

    let mut last = vec![-1i64; threads];
    for record in &records {
        assert_eq!(record.source(), "pipeline.worker");
        assert_eq!(record.attribute_str("metadata"), Some(r#"deployment="blue""#));
        let t = record.attribute("thread").and_then(|v| v.as_u64()).unwrap() as usize;
        let seq = record.attribute("seq").and_then(|v| v.as_i64()).unwrap();
        assert!(seq > last[t], "records from one thread must stay in order");
        last[t] = seq;
    }
}

#[test]
fn exact_rules_do_not_match_sub_namespaces() {
    let config = LoggingConfig::from_toml_str(CONFIG).unwrap();
    let (dispatch, built) = dispatch_for(&config);

    tracing::dispatcher::with_default(&dispatch, || {
        tracing::info!(target: "pipeline.exact", "suppressed");
        tracing::info!(target: "pipeline.exact.child", "kept");
        tracing::warn!(target: "pipeline.exact", "kept too");
    });

    let messages: Vec<String> = built.queue.drain().filter_map(|r| r.message).collect();
    assert_eq!(messages, vec!["kept".to_string(), "kept too".to_string()]);
}

#[test]
fn context_updates_apply_to_later_records_only() {
    let config = LoggingConfig::from_toml_str(CONFIG).unwrap();
    let (dispatch, built) = dispatch_for(&config);

    tracing::dispatcher::with_default(&dispatch, || {
        built.context.set("request_id", "a");
        tracing::info!(target: "pipeline.http", "first");
        built.context.set("request_id", "b");
        built.context.set("user", "ann");
        tracing::info!(target: "pipeline.http", "second");
        built.context.delete("request_id");
        tracing::info!(target: "pipeline.http", "third");
    });

    let metadata: Vec<String> = built
        .queue
        .drain()
        .map(|r| r.attribute_str("metadata").unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        metadata,
        vec![
            r#"request_id="a""#.to_string(),
            r#"request_id="b" user="ann""#.to_string(),
            r#"user="ann""#.to_string(),
        ]
    );
}
