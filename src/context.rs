//! Context attribute injection.
//!
//! A [`ContextInjector`] copies a fixed set of key/value pairs onto every
//! record it sees. In metadata mode it also maintains a single
//! `key="value" key2="value2"` string attribute, with `"` and `\` in values
//! backslash-escaped. Stacking several injectors
//! on one record updates keys in place instead of repeating them.

use crate::filter::RecordFilter;
use crate::record::LogRecord;
use parking_lot::RwLock;
use serde_json::Value;

pub const DEFAULT_METADATA_ATTRIBUTE: &str = "metadata";

/// Filter stage that attaches context attributes and never suppresses.
///
/// The context map can be changed between log calls through [`get`],
/// [`set`] and [`delete`]; records already processed are unaffected.
/// Key names must not collide with the metadata attribute name.
///
/// [`get`]: ContextInjector::get
/// [`set`]: ContextInjector::set
/// [`delete`]: ContextInjector::delete
#[derive(Debug)]
pub struct ContextInjector {
    context: RwLock<Vec<(String, String)>>,
    metadata_mode: bool,
    metadata_attribute: String,
}

impl ContextInjector {
    /// Injector that only sets plain attributes.
    pub fn new<I, K, V>(context: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_options(context, false, DEFAULT_METADATA_ATTRIBUTE)
    }

    /// Injector that also maintains the metadata string under
    /// [`DEFAULT_METADATA_ATTRIBUTE`].
    pub fn with_metadata<I, K, V>(context: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_options(context, true, DEFAULT_METADATA_ATTRIBUTE)
    }

    /// Full constructor. An empty `metadata_attribute` falls back to
    /// [`DEFAULT_METADATA_ATTRIBUTE`]. Later duplicates of a key overwrite
    /// the earlier value but keep its position.
    pub fn with_options<I, K, V>(context: I, metadata_mode: bool, metadata_attribute: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let injector = Self {
            context: RwLock::new(Vec::new()),
            metadata_mode,
            metadata_attribute: if metadata_attribute.is_empty() {
                DEFAULT_METADATA_ATTRIBUTE.to_string()
            } else {
                metadata_attribute.to_string()
            },
        };
        for (key, value) in context {
            injector.set(key, value);
        }
        injector
    }

    pub fn metadata_mode(&self) -> bool {
        self.metadata_mode
    }

    pub fn metadata_attribute(&self) -> &str {
        &self.metadata_attribute
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.context
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert or update a key. Updated keys keep their position.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut context = self.context.write();
        match context.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => context.push((key, value)),
        }
    }

    /// Remove a key; missing keys are ignored.
    pub fn delete(&self, key: &str) {
        self.context.write().retain(|(k, _)| k != key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.context.read().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn inject(&self, record: &mut LogRecord) {
        let context = self.context.read();
        if !self.metadata_mode {
            for (key, value) in context.iter() {
                record.set_attribute(key.clone(), value.clone());
            }
            return;
        }

        let mut metadata = format!(" {}", current_metadata(record, &self.metadata_attribute));
        for (key, value) in context.iter() {
            if !record.has_attribute(key) || !replace_token(&mut metadata, key, value) {
                push_token(&mut metadata, key, value);
            }
            record.set_attribute(key.clone(), value.clone());
        }
        record.set_attribute(
            self.metadata_attribute.clone(),
            metadata.trim_start().to_string(),
        );
    }
}

impl Default for ContextInjector {
    fn default() -> Self {
        Self::new(Vec::<(String, String)>::new())
    }
}

impl RecordFilter for ContextInjector {
    fn evaluate(&self, record: &mut LogRecord) -> bool {
        self.inject(record);
        true
    }
}

fn current_metadata(record: &LogRecord, attribute: &str) -> String {
    match record.attribute(attribute) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn push_token(metadata: &mut String, key: &str, value: &str) {
    metadata.push(' ');
    metadata.push_str(key);
    metadata.push_str("=\"");
    push_escaped(metadata, value);
    metadata.push('"');
}

/// Values are quoted, so `"` and `\` inside them are backslash-escaped.
fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Byte offset of the first `"` in `text` not preceded by an escaping `\`.
fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Rewrite every ` key="..."` token in `metadata` to carry `value`.
/// `metadata` must start with a space so the first token is found too.
/// Quoted values are skipped whole, so text inside another key's value
/// never matches. Returns `false` when no token for `key` exists.
fn replace_token(metadata: &mut String, key: &str, value: &str) -> bool {
    let needle = format!(" {}=\"", key);
    let mut out = String::with_capacity(metadata.len() + value.len());
    let mut rest = metadata.as_str();
    let mut replaced = false;

    while let Some(open) = rest.find("=\"") {
        let value_start = open + 2;
        let Some(len) = closing_quote(&rest[value_start..]) else {
            break;
        };
        let token_end = value_start + len + 1;
        if rest[..value_start].ends_with(&needle) {
            out.push_str(&rest[..value_start]);
            push_escaped(&mut out, value);
            out.push('"');
            replaced = true;
        } else {
            out.push_str(&rest[..token_end]);
        }
        rest = &rest[token_end..];
    }
    out.push_str(rest);

    if replaced {
        *metadata = out;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;

    fn record() -> LogRecord {
        LogRecord::new("name", Severity::Debug).with_message("msg")
    }

    #[test]
    fn test_context_attributes_are_injected() {
        let mut rec = record();
        let filter = ContextInjector::new([("foo", "bar"), ("bar", "baz")]);

        assert!(filter.evaluate(&mut rec));
        assert_eq!(rec.attribute_str("foo"), Some("bar"));
        assert_eq!(rec.attribute_str("bar"), Some("baz"));
        assert!(!rec.has_attribute("metadata"));
    }

    #[test]
    fn test_plain_mode_overwrites_existing_attribute() {
        let mut rec = record().with_attribute("foo", 7);
        ContextInjector::new([("foo", "bar")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("foo"), Some("bar"));
    }

    #[test]
    fn test_metadata_is_injected_when_configured() {
        let mut rec = record();
        let filter = ContextInjector::with_metadata([("foo", "bar"), ("bar", "baz")]);

        assert!(filter.evaluate(&mut rec));
        assert_eq!(rec.attribute_str("foo"), Some("bar"));
        assert_eq!(rec.attribute_str("bar"), Some("baz"));
        assert_eq!(rec.attribute_str("metadata"), Some(r#"foo="bar" bar="baz""#));
    }

    #[test]
    fn test_second_injector_replaces_duplicate_keys() {
        let mut rec = record();

        let first = ContextInjector::with_metadata([("foo", "bar1"), ("bar", "baz1")]);
        assert!(first.evaluate(&mut rec));
        assert_eq!(rec.attribute_str("metadata"), Some(r#"foo="bar1" bar="baz1""#));

        let second = ContextInjector::with_metadata([("foo", "bar2"), ("bar", "baz2"), ("bleh", "blah")]);
        assert!(second.evaluate(&mut rec));
        assert_eq!(rec.attribute_str("foo"), Some("bar2"));
        assert_eq!(rec.attribute_str("bar"), Some("baz2"));
        assert_eq!(rec.attribute_str("bleh"), Some("blah"));
        assert_eq!(
            rec.attribute_str("metadata"),
            Some(r#"foo="bar2" bar="baz2" bleh="blah""#)
        );
    }

    #[test]
    fn test_second_injector_keeps_first_seen_order() {
        let mut rec = record();
        ContextInjector::with_metadata([("a", "1"), ("b", "2")]).evaluate(&mut rec);
        ContextInjector::with_metadata([("c", "3"), ("a", "9")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"a="9" b="2" c="3""#));
    }

    #[test]
    fn test_existing_attribute_without_token_is_appended_once() {
        let mut rec = record().with_attribute("request_id", "from-event");
        ContextInjector::with_metadata([("request_id", "abc")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"request_id="abc""#));
        assert_eq!(rec.attribute_str("request_id"), Some("abc"));
    }

    #[test]
    fn test_key_that_is_suffix_of_other_key_is_not_confused() {
        let mut rec = record();
        ContextInjector::with_metadata([("user_id", "1"), ("id", "2")]).evaluate(&mut rec);
        ContextInjector::with_metadata([("id", "3")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"user_id="1" id="3""#));
    }

    #[test]
    fn test_custom_metadata_attribute_name() {
        let mut rec = record();
        ContextInjector::with_options([("foo", "bar")], true, "ctx").evaluate(&mut rec);
        assert_eq!(rec.attribute_str("ctx"), Some(r#"foo="bar""#));
        assert!(!rec.has_attribute("metadata"));
    }

    #[test]
    fn test_empty_metadata_attribute_name_falls_back() {
        let injector = ContextInjector::with_options(Vec::<(String, String)>::new(), true, "");
        assert_eq!(injector.metadata_attribute(), DEFAULT_METADATA_ATTRIBUTE);
    }

    #[test]
    fn test_empty_context_in_metadata_mode_writes_empty_string() {
        let mut rec = record();
        ContextInjector::with_metadata(Vec::<(String, String)>::new()).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(""));
    }

    #[test]
    fn test_get_set_delete() {
        let injector = ContextInjector::new([("a", "1")]);
        assert_eq!(injector.get("a").as_deref(), Some("1"));
        assert_eq!(injector.get("missing"), None);

        injector.set("b", "2");
        injector.set("a", "3");
        assert_eq!(injector.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(injector.get("a").as_deref(), Some("3"));

        injector.delete("a");
        injector.delete("missing");
        assert_eq!(injector.keys(), vec!["b".to_string()]);
    }

    #[test]
    fn test_updates_do_not_affect_processed_records() {
        let injector = ContextInjector::with_metadata([("tenant", "acme")]);
        let mut before = record();
        injector.evaluate(&mut before);

        injector.set("tenant", "globex");
        let mut after = record();
        injector.evaluate(&mut after);

        assert_eq!(before.attribute_str("metadata"), Some(r#"tenant="acme""#));
        assert_eq!(after.attribute_str("metadata"), Some(r#"tenant="globex""#));
    }

    #[test]
    fn test_replace_token_rewrites_all_occurrences() {
        let mut metadata = r#" k="a" x="1" k="b""#.to_string();
        assert!(replace_token(&mut metadata, "k", "z"));
        assert_eq!(metadata, r#" k="z" x="1" k="z""#);
        assert!(!replace_token(&mut metadata, "missing", "v"));
    }

    #[test]
    fn test_quotes_in_values_are_escaped() {
        let mut rec = record();
        ContextInjector::with_metadata([("k", r#"a"b"#), ("x", "1")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"k="a\"b" x="1""#));
        assert_eq!(rec.attribute_str("k"), Some(r#"a"b"#));

        ContextInjector::with_metadata([("k", "new")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"k="new" x="1""#));
    }

    #[test]
    fn test_backslashes_in_values_are_escaped() {
        let mut rec = record();
        ContextInjector::with_metadata([("path", r"c:\tmp\"), ("x", "1")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"path="c:\\tmp\\" x="1""#));

        ContextInjector::with_metadata([("x", "2")]).evaluate(&mut rec);
        assert_eq!(rec.attribute_str("metadata"), Some(r#"path="c:\\tmp\\" x="2""#));
    }

    #[test]
    fn test_key_lookalike_inside_value_is_not_rewritten() {
        let mut metadata = r#" note=" k=" k="a""#.to_string();
        assert!(replace_token(&mut metadata, "k", "z"));
        assert_eq!(metadata, r#" note=" k=" k="z""#);
    }
}
