//! Configuration validation utilities.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse duration string using humantime.
///
/// Supports `10s`, `500ms`, `1m30s` and the other humantime formats.
///
/// # Examples
///
/// ```
/// use stc_agent::config::parse_duration;
///
/// assert_eq!(parse_duration("10s").unwrap().as_secs(), 10);
/// assert_eq!(parse_duration("1m30s").unwrap().as_secs(), 90);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Parse a listener bind address.
pub fn parse_bind_address(s: &str) -> Result<IpAddr, ConfigError> {
    s.trim()
        .parse::<IpAddr>()
        .map_err(|_| ConfigError::ValidationError(format!("invalid bind address: '{s}'")))
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let default_value = caps.get(2).map_or("", |m| m.as_str());
            std::env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}
