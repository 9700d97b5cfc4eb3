//! Environment variable names that override scalar logging settings.
//!
//! These are purely helpers; see
//! [`LoggingConfig::apply_env`](crate::config::LoggingConfig::apply_env).

/// Minimum severity, e.g. `INFO`.
pub const LOGGING_LEVEL_ENV: &str = "LOGGING__LEVEL";

/// Default line template for console and file handlers.
pub const LOGGING_FORMAT_ENV: &str = "LOGGING__FORMAT";

/// `strftime` pattern for the `{timestamp}` placeholder.
pub const LOGGING_DATEFMT_ENV: &str = "LOGGING__DATEFMT";
