use crate::filter::RecordFilter;
use crate::format::RecordFormatter;
use crate::queue::RecordQueue;
use crate::record::LogRecord;
use crate::severity::Severity;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Final stage of the pipeline: takes ownership of a record that passed
/// every filter.
///
/// `emit` runs on the producing thread and must not block for long.
/// Handlers report their own I/O failures (on stderr) rather than returning
/// them, since the caller is an arbitrary log statement.
pub trait RecordHandler: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// A handler together with its minimum severity and filter chain.
pub struct HandlerSlot {
    min_severity: Severity,
    filters: Vec<Arc<dyn RecordFilter>>,
    handler: Box<dyn RecordHandler>,
}

impl HandlerSlot {
    pub fn new(handler: Box<dyn RecordHandler>) -> Self {
        Self {
            min_severity: Severity::Trace,
            filters: Vec::new(),
            handler,
        }
    }

    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// Append a filter; filters run in the order they were added.
    pub fn with_filter(mut self, filter: Arc<dyn RecordFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Run the filter chain and emit. Returns `false` when the record was
    /// below the slot severity or a filter suppressed it.
    pub fn handle(&self, mut record: LogRecord) -> bool {
        if record.severity() < self.min_severity {
            return false;
        }
        for filter in &self.filters {
            if !filter.evaluate(&mut record) {
                return false;
            }
        }
        self.handler.emit(record);
        true
    }
}

/// Handler whose emit step pushes records into a [`RecordQueue`].
#[derive(Debug, Clone)]
pub struct QueuedHandler {
    queue: RecordQueue,
}

impl QueuedHandler {
    pub fn new(queue: RecordQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &RecordQueue {
        &self.queue
    }
}

impl RecordHandler for QueuedHandler {
    fn emit(&self, record: LogRecord) {
        self.queue.enqueue(record);
    }
}

/// Writes formatted records, one per line, to a stream (stdout by default).
pub struct ConsoleHandler {
    formatter: RecordFormatter,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleHandler {
    pub fn stdout(formatter: RecordFormatter) -> Self {
        Self::new(formatter, std::io::stdout())
    }

    pub fn new(formatter: RecordFormatter, writer: impl Write + Send + 'static) -> Self {
        Self {
            formatter,
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl RecordHandler for ConsoleHandler {
    fn emit(&self, record: LogRecord) {
        let line = self.formatter.format(&record);
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            eprintln!("console log handler write failed: {}", e);
        }
    }
}
