//! Per-source severity suppression.
//!
//! [`SourceLevelFilter`] holds a set of [`SourceRule`]s built once from
//! configuration. A record is suppressed when any rule matches its source
//! and requires a higher severity than the record has.

use crate::error::ConfigError;
use crate::record::LogRecord;
use crate::severity::Severity;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// One stage of a handler's filter chain.
///
/// Filters run synchronously on the producing thread. Returning `false`
/// discards the record for the handler that owns the chain; filters may
/// also add or overwrite record attributes.
pub trait RecordFilter: Send + Sync {
    fn evaluate(&self, record: &mut LogRecord) -> bool;
}

/// Rule specification as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceRuleConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_regex")]
    pub regex: bool,
}

fn default_level() -> String {
    "DEBUG".to_string()
}

fn default_regex() -> bool {
    true
}

impl Default for SourceRuleConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            regex: default_regex(),
        }
    }
}

impl SourceRuleConfig {
    pub fn new(level: impl Into<String>, regex: bool) -> Self {
        Self {
            level: level.into(),
            regex,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MatchMode {
    /// Literal string equality.
    Exact,
    /// Case-insensitive, anchored at both ends.
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct SourceRule {
    source_pattern: String,
    match_mode: MatchMode,
    min_severity: Severity,
}

impl SourceRule {
    pub fn new(source_pattern: &str, config: &SourceRuleConfig) -> Result<Self, ConfigError> {
        let min_severity = config.level.parse::<Severity>()?;
        let match_mode = if config.regex {
            let regex = RegexBuilder::new(&format!("^(?:{})$", source_pattern))
                .case_insensitive(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: source_pattern.to_string(),
                    source,
                })?;
            MatchMode::Regex(regex)
        } else {
            MatchMode::Exact
        };

        Ok(Self {
            source_pattern: source_pattern.to_string(),
            match_mode,
            min_severity,
        })
    }

    pub fn source_pattern(&self) -> &str {
        &self.source_pattern
    }

    pub fn match_mode(&self) -> &MatchMode {
        &self.match_mode
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn matches(&self, source: &str) -> bool {
        match &self.match_mode {
            MatchMode::Exact => source == self.source_pattern,
            MatchMode::Regex(regex) => regex.is_match(source),
        }
    }

    /// `true` when this rule alone would suppress the record.
    pub fn suppresses(&self, record: &LogRecord) -> bool {
        record.severity() < self.min_severity && self.matches(record.source())
    }
}

/// Filter that suppresses records per source name and severity.
#[derive(Debug, Clone, Default)]
pub struct SourceLevelFilter {
    rules: Vec<SourceRule>,
}

impl SourceLevelFilter {
    /// Build the filter from a `source pattern -> rule` mapping.
    ///
    /// Fails on the first unknown severity name or malformed pattern.
    pub fn new<I, K>(config: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, SourceRuleConfig)>,
        K: AsRef<str>,
    {
        let rules = config
            .into_iter()
            .map(|(pattern, rule)| SourceRule::new(pattern.as_ref(), &rule))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[SourceRule] {
        &self.rules
    }

    /// `true` keeps the record, `false` suppresses it.
    pub fn allows(&self, record: &LogRecord) -> bool {
        !self.rules.iter().any(|rule| rule.suppresses(record))
    }
}

impl RecordFilter for SourceLevelFilter {
    fn evaluate(&self, record: &mut LogRecord) -> bool {
        self.allows(record)
    }
}
