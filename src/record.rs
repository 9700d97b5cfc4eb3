use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// One logging event as it travels through the filter chain and the queue.
///
/// `source` and `severity` are fixed when the record is created. Everything
/// filters add lands in `attributes`, an insertion-ordered map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    severity: Severity,
    source: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: Option<String>,
    pub attributes: Map<String, Value>,
}

impl LogRecord {
    pub fn new(source: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            source: source.into(),
            module_path: None,
            file: None,
            line: None,
            message: None,
            attributes: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Dotted name of the component that produced the record.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// String view of an attribute; `None` when missing or not a string.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Insert or overwrite an attribute. An overwritten key keeps its
    /// original position.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.shift_remove(key)
    }
}
