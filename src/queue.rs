use crate::record::LogRecord;
use crossbeam_queue::SegQueue;
use std::sync::Arc;

/// Unbounded, thread-safe FIFO of [`LogRecord`]s shared between producers
/// and a polling consumer.
///
/// The queue is a handle: clones refer to the same underlying storage, which
/// lives as long as any handle does. The composing application creates one
/// at startup and hands clones to the queued handlers (producer side) and to
/// whatever drains it (consumer side).
///
/// Per-producer ordering is preserved. Neither side ever blocks and neither
/// operation can fail; an empty queue is a normal result.
#[derive(Clone, Default)]
pub struct RecordQueue {
    inner: Arc<SegQueue<LogRecord>>,
}

impl RecordQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the tail. Never blocks and provides no
    /// backpressure.
    pub fn enqueue(&self, record: LogRecord) {
        self.inner.push(record);
    }

    /// Take the head record, or `None` right away when the queue is empty.
    pub fn try_dequeue(&self) -> Option<LogRecord> {
        self.inner.pop()
    }

    /// Snapshot of the current length; may be stale under concurrent use.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterator that dequeues until the queue is observed empty.
    pub fn drain(&self) -> Drain<'_> {
        Drain { queue: self }
    }

    /// `true` when both handles point at the same queue.
    pub fn same_queue(&self, other: &RecordQueue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for RecordQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordQueue").field("len", &self.len()).finish()
    }
}

pub struct Drain<'a> {
    queue: &'a RecordQueue,
}

impl Iterator for Drain<'_> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.try_dequeue()
    }
}
