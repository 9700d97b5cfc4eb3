use crate::queue::RecordQueue;
use crate::record::LogRecord;
use crate::sink::LogSink;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, Duration};

/// Tuning of a drain task.
///
/// **Fields**
/// - `batch_size`: maximum records handed to the sink per call.
/// - `poll_interval`: how long the task sleeps after finding the queue
///   empty.
/// - `initial_backoff` / `max_backoff`: retry delay after a sink failure,
///   doubled on every consecutive failure up to `max_backoff`.
#[derive(Clone, Debug)]
pub struct DrainConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            poll_interval: Duration::from_millis(200),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }
}

/// Running drain task. Dropping the handle leaves the task running.
pub struct DrainHandle {
    stop: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    task: JoinHandle<()>,
    /// Records the sink accepted.
    pub delivered_events: Arc<AtomicU64>,
    /// Records dropped because the sink still failed during shutdown.
    pub dropped_events: Arc<AtomicU64>,
}

impl DrainHandle {
    /// Ask the task to deliver the records queued at this point, flush the
    /// sink and exit; resolves when it has. Records enqueued afterwards stay
    /// in the queue.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.stopping.store(true, Ordering::SeqCst);
        self.stop.notify_one();
        self.task.await
    }
}

/// Spawn a Tokio task that polls `queue` and forwards records to `sink`.
///
/// Records are delivered in dequeue order. A failed batch is retried as a
/// whole, so a sink that fails halfway through a batch may see some records
/// twice.
///
/// Minimal thresholds are enforced for `batch_size` and `poll_interval`.
pub fn spawn_drain(queue: RecordQueue, sink: Arc<dyn LogSink>, config: DrainConfig) -> DrainHandle {
    let batch_size = config.batch_size.max(1);
    let poll_interval = config.poll_interval.max(Duration::from_millis(1));

    let stop = Arc::new(Notify::new());
    let stopping = Arc::new(AtomicBool::new(false));
    let delivered_events = Arc::new(AtomicU64::new(0));
    let dropped_events = Arc::new(AtomicU64::new(0));

    let stop_bg = Arc::clone(&stop);
    let stopping_bg = Arc::clone(&stopping);
    let delivered_bg = Arc::clone(&delivered_events);
    let dropped_bg = Arc::clone(&dropped_events);

    let task = tokio::spawn(async move {
        loop {
            let batch = take_batch(&queue, batch_size);
            if !batch.is_empty() {
                let counter = if deliver(&*sink, &batch, &config, &stopping_bg).await {
                    &delivered_bg
                } else {
                    &dropped_bg
                };
                counter.fetch_add(batch.len() as u64, Ordering::Relaxed);
                if batch.len() == batch_size && !stopping_bg.load(Ordering::SeqCst) {
                    continue;
                }
            }

            if stopping_bg.load(Ordering::SeqCst) {
                // Deliver only what was queued when shutdown began.
                let mut remaining = queue.len();
                while remaining > 0 {
                    let batch = take_batch(&queue, batch_size.min(remaining));
                    if batch.is_empty() {
                        break;
                    }
                    remaining -= batch.len();
                    let counter = if deliver(&*sink, &batch, &config, &stopping_bg).await {
                        &delivered_bg
                    } else {
                        &dropped_bg
                    };
                    counter.fetch_add(batch.len() as u64, Ordering::Relaxed);
                }
                if let Err(e) = sink.flush().await {
                    eprintln!("log sink flush failed: {}", e);
                }
                break;
            }

            tokio::select! {
                _ = sleep(poll_interval) => {}
                _ = stop_bg.notified() => {}
            }
        }
    });

    DrainHandle {
        stop,
        stopping,
        task,
        delivered_events,
        dropped_events,
    }
}

fn take_batch(queue: &RecordQueue, batch_size: usize) -> Vec<LogRecord> {
    queue.drain().take(batch_size).collect()
}

/// Send until the sink accepts the batch. Once shutdown has been requested
/// a failure drops the batch instead of retrying.
async fn deliver(sink: &dyn LogSink, batch: &[LogRecord], config: &DrainConfig, stopping: &AtomicBool) -> bool {
    let mut backoff = config.initial_backoff;
    loop {
        match sink.send_batch(batch).await {
            Ok(()) => return true,
            Err(e) if stopping.load(Ordering::SeqCst) => {
                eprintln!("dropping {} log records during shutdown: {}", batch.len(), e);
                return false;
            }
            Err(e) => {
                eprintln!("log sink send failed, retrying in {:?}: {}", backoff, e);
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, config.max_backoff);
            }
        }
    }
}
