/// Error returned when filters, handlers or the whole pipeline are built
/// from configuration.
///
/// Every variant is detected at construction time; evaluating records
/// against an already-built pipeline never fails.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown severity name: {0:?}")]
    UnknownSeverity(String),

    #[error("invalid source pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),

    #[error("invalid size: {0:?}")]
    InvalidSize(String),

    #[error("no custom handler registered under {0:?}")]
    UnknownHandler(String),

    #[error("custom handler {name:?} rejected its arguments: {reason}")]
    HandlerArgs { name: String, reason: String },

    #[error("failed to parse logging configuration")]
    Toml(#[from] toml::de::Error),

    #[error("i/o error while building logging configuration")]
    Io(#[from] std::io::Error),
}

/// Error returned by [`init_logging`](crate::init::init_logging).
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("a global tracing subscriber is already installed")]
    GlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
