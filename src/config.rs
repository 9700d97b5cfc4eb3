use crate::env;
use crate::error::ConfigError;
use crate::file::{parse_size, DEFAULT_BACKUP_COUNT, DEFAULT_FILE_NAME, DEFAULT_MAX_BYTES};
use crate::filter::SourceRuleConfig;
use crate::format::{DEFAULT_DATEFMT, DEFAULT_FORMAT};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Logging configuration.
///
/// Usually read from the `[logging]` table of a TOML document:
///
/// ```toml
/// [logging]
/// level = "INFO"
/// format = "{timestamp} {level} {source}: {message} {metadata}"
///
/// [logging.filters."hyper\\..*"]
/// level = "WARN"
///
/// [[logging.handlers]]
/// type = "queued"
///
/// [[logging.handlers]]
/// type = "file"
/// path = "logs"
/// max_size = "16MiB"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum severity of the layer and default for handlers.
    pub level: String,
    pub format: String,
    pub datefmt: String,
    /// Source pattern -> suppression rule.
    pub filters: BTreeMap<String, SourceRuleConfig>,
    pub handlers: Vec<HandlerConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "DEBUG".to_string(),
            format: DEFAULT_FORMAT.to_string(),
            datefmt: DEFAULT_DATEFMT.to_string(),
            filters: BTreeMap::new(),
            handlers: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    logging: LoggingConfig,
}

impl LoggingConfig {
    /// Parse the `[logging]` table of a TOML document. A document without
    /// that table yields the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let document: Document = toml::from_str(text)?;
        Ok(document.logging)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Override scalar settings from the `LOGGING__*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup(env::LOGGING_LEVEL_ENV) {
            self.level = level;
        }
        if let Some(format) = lookup(env::LOGGING_FORMAT_ENV) {
            self.format = format;
        }
        if let Some(datefmt) = lookup(env::LOGGING_DATEFMT_ENV) {
            self.datefmt = datefmt;
        }
    }
}

/// One entry of `handlers`.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    #[serde(flatten)]
    pub kind: HandlerKind,
    /// Overrides [`LoggingConfig::level`] for this handler.
    #[serde(default)]
    pub level: Option<String>,
    /// Overrides [`LoggingConfig::format`] for this handler.
    #[serde(default)]
    pub format: Option<String>,
}

impl HandlerConfig {
    pub fn new(kind: HandlerKind) -> Self {
        Self {
            kind,
            level: None,
            format: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HandlerKind {
    Console,
    Queued,
    File {
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        max_size: Option<ByteSize>,
        #[serde(default)]
        max_count: Option<usize>,
    },
    /// Handler built by a factory registered in a
    /// [`HandlerRegistry`](crate::registry::HandlerRegistry) under `class`.
    Custom {
        class: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
}

/// File size given either as a byte count or as a string with a
/// `KiB`/`MiB`/`GiB` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ByteSize {
    Bytes(u64),
    Text(String),
}

impl ByteSize {
    pub fn bytes(&self) -> Result<u64, ConfigError> {
        match self {
            ByteSize::Bytes(n) => Ok(*n),
            ByteSize::Text(text) => parse_size(text),
        }
    }
}

/// Resolved settings of a file handler entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettings {
    pub dir: PathBuf,
    pub name: String,
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl FileSettings {
    pub fn resolve(
        path: Option<&Path>,
        name: Option<&str>,
        max_size: Option<&ByteSize>,
        max_count: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let dir = path.unwrap_or_else(|| Path::new("."));
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };
        Ok(Self {
            dir,
            name: name.unwrap_or(DEFAULT_FILE_NAME).to_string(),
            max_bytes: max_size.map(ByteSize::bytes).transpose()?.unwrap_or(DEFAULT_MAX_BYTES),
            backup_count: max_count.unwrap_or(DEFAULT_BACKUP_COUNT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_logging_table_gives_defaults() {
        let config = LoggingConfig::from_toml_str("[server]\nport = 80\n").unwrap();
        assert_eq!(config.level, "DEBUG");
        assert_eq!(config.format, DEFAULT_FORMAT);
        assert_eq!(config.datefmt, DEFAULT_DATEFMT);
        assert!(config.filters.is_empty());
        assert!(config.handlers.is_empty());
    }

    #[test]
    fn test_full_document() {
        let text = r#"
            [logging]
            level = "info"
            format = "{level} {message}"

            [logging.filters."hyper\\..*"]
            level = "WARN"

            [logging.filters."app.db"]
            level = "ERROR"
            regex = false

            [[logging.handlers]]
            type = "queued"

            [[logging.handlers]]
            type = "console"
            level = "ERROR"
            format = "{message}"

            [[logging.handlers]]
            type = "file"
            path = "/var/log/app"
            max_size = "16MiB"
            max_count = 3

            [[logging.handlers]]
            type = "custom"
            class = "acme.Exporter"
            args = { endpoint = "http://collector:4318", retries = 3 }
        "#;
        let config = LoggingConfig::from_toml_str(text).unwrap();

        assert_eq!(config.level, "info");
        assert_eq!(config.filters["hyper\\..*"], SourceRuleConfig::new("WARN", true));
        assert_eq!(config.filters["app.db"], SourceRuleConfig::new("ERROR", false));
        assert_eq!(config.handlers.len(), 4);

        assert!(matches!(config.handlers[0].kind, HandlerKind::Queued));
        assert_eq!(config.handlers[1].level.as_deref(), Some("ERROR"));
        assert_eq!(config.handlers[1].format.as_deref(), Some("{message}"));
        match &config.handlers[2].kind {
            HandlerKind::File { path, name, max_size, max_count } => {
                assert_eq!(path.as_deref(), Some(Path::new("/var/log/app")));
                assert_eq!(name, &None);
                assert_eq!(max_size, &Some(ByteSize::Text("16MiB".to_string())));
                assert_eq!(max_count, &Some(3));
            }
            other => panic!("expected file handler, got {other:?}"),
        }
        match &config.handlers[3].kind {
            HandlerKind::Custom { class, args } => {
                assert_eq!(class, "acme.Exporter");
                assert_eq!(args["endpoint"], "http://collector:4318");
                assert_eq!(args["retries"], 3);
            }
            other => panic!("expected custom handler, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_handler_type_is_rejected() {
        let err = LoggingConfig::from_toml_str("[[logging.handlers]]\ntype = \"syslog\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = LoggingConfig::default();
        config.apply_overrides(|key| match key {
            env::LOGGING_LEVEL_ENV => Some("WARN".to_string()),
            env::LOGGING_DATEFMT_ENV => Some("%H:%M".to_string()),
            _ => None,
        });
        assert_eq!(config.level, "WARN");
        assert_eq!(config.format, DEFAULT_FORMAT);
        assert_eq!(config.datefmt, "%H:%M");
    }

    #[test]
    fn test_file_settings_defaults() {
        let settings = FileSettings::resolve(Some(Path::new("/tmp/logs")), None, None, None).unwrap();
        assert_eq!(settings.dir, PathBuf::from("/tmp/logs"));
        assert_eq!(settings.name, DEFAULT_FILE_NAME);
        assert_eq!(settings.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(settings.backup_count, DEFAULT_BACKUP_COUNT);

        let sized = FileSettings::resolve(None, Some("svc.log"), Some(&ByteSize::Bytes(1000)), Some(2)).unwrap();
        assert!(sized.dir.is_absolute());
        assert_eq!(sized.max_bytes, 1000);
        assert_eq!(sized.backup_count, 2);

        let err = FileSettings::resolve(None, None, Some(&ByteSize::Text("big".into())), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSize(_)));
    }
}
