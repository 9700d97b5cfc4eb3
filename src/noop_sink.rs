use crate::record::LogRecord;
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// A sink that counts records and drops them.
///
/// Useful for measuring producer-side overhead of the pipeline without
/// any external I/O.
#[derive(Debug, Default)]
pub struct NoopSink {
    received: AtomicU64,
}

impl NoopSink {
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), SinkError> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
