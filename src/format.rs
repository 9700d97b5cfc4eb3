use crate::error::ConfigError;
use crate::record::LogRecord;
use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde_json::Value;
use std::fmt::Write;

pub const DEFAULT_FORMAT: &str = "{level}:{source}:{message}";
pub const DEFAULT_DATEFMT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Field(String),
}

/// Renders a [`LogRecord`] as one line of text.
///
/// Templates use `{name}` placeholders. Built-in names are `timestamp`,
/// `level`, `source`, `message`, `module`, `file` and `line`; any other name
/// is looked up in the record attributes and renders empty when missing.
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    pieces: Vec<Piece>,
    datefmt: String,
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self {
            pieces: parse_template(DEFAULT_FORMAT),
            datefmt: DEFAULT_DATEFMT.to_string(),
        }
    }
}

impl RecordFormatter {
    /// `datefmt` is a chrono `strftime` pattern, validated here.
    pub fn new(template: &str, datefmt: &str) -> Result<Self, ConfigError> {
        if StrftimeItems::new(datefmt).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidDateFormat(datefmt.to_string()));
        }
        Ok(Self {
            pieces: parse_template(template),
            datefmt: datefmt.to_string(),
        })
    }

    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Field(name) => self.write_field(&mut out, record, name),
            }
        }
        out
    }

    fn write_field(&self, out: &mut String, record: &LogRecord, name: &str) {
        match name {
            "timestamp" => {
                let local = record.timestamp.with_timezone(&Local);
                let _ = write!(out, "{}", local.format(&self.datefmt));
            }
            "level" => out.push_str(record.severity().as_str()),
            "source" => out.push_str(record.source()),
            "message" => out.push_str(record.message.as_deref().unwrap_or_default()),
            "module" => out.push_str(record.module_path.as_deref().unwrap_or_default()),
            "file" => out.push_str(record.file.as_deref().unwrap_or_default()),
            "line" => {
                if let Some(line) = record.line {
                    let _ = write!(out, "{}", line);
                }
            }
            other => match record.attribute(other) {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Null) | None => {}
                Some(value) => {
                    let _ = write!(out, "{}", value);
                }
            },
        }
    }
}

fn parse_template(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if closed {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Field(name.trim().to_string()));
                } else {
                    // unterminated placeholder is kept verbatim
                    literal.push('{');
                    literal.push_str(&name);
                }
            }
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}
