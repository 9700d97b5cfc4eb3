use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

pub type SinkError = Box<dyn Error + Send + Sync>;

/// Asynchronous destination for records pulled off a
/// [`RecordQueue`](crate::queue::RecordQueue) by a drain task.
///
/// Sinks run on the consumer side only; producers never wait on them.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one record. An `Err` is treated as transient and the drain
    /// task retries the batch with backoff.
    async fn send(&self, record: &LogRecord) -> Result<(), SinkError>;

    /// Deliver a batch in order. The default sends records one by one and
    /// stops at the first failure.
    async fn send_batch(&self, records: &[LogRecord]) -> Result<(), SinkError> {
        for record in records {
            self.send(record).await?;
        }
        Ok(())
    }

    /// Flush backend-side buffers. Default is a no-op.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
