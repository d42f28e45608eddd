//! Application configuration structures.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::collector::CollectorsConfig;
use super::validation::{ConfigError, parse_bind_address};

/// Default TCP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info,stc_agent=debug";

/// Where the service accepts sessions.
///
/// At most one of `unix_socket` and `tcp_port` may be set. With neither, a
/// Unix socket is created at a generated path under the temp directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Unix socket path.
    pub unix_socket: Option<PathBuf>,

    /// TCP port; 0 lets the OS pick one.
    pub tcp_port: Option<u16>,

    /// TCP bind address (default: "127.0.0.1").
    pub bind: String,

    /// System-under-test name, used in generated socket names.
    pub sut_name: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            unix_socket: None,
            tcp_port: None,
            bind: DEFAULT_BIND.to_string(),
            sut_name: None,
        }
    }
}

impl ListenerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unix_socket.is_some() && self.tcp_port.is_some() {
            return Err(ConfigError::ValidationError(
                "listener unix_socket and tcp_port are mutually exclusive".to_string(),
            ));
        }
        if let Some(path) = &self.unix_socket {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(
                    "listener unix_socket cannot be empty".to_string(),
                ));
            }
        }
        parse_bind_address(&self.bind)?;
        Ok(())
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Collector configuration.
    pub collectors: CollectorsConfig,

    /// Log filter directive, overridden by `RUST_LOG`.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            collectors: CollectorsConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate()?;
        self.collectors.validate()?;
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_level cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.listener.bind, "127.0.0.1");
        assert!(config.listener.unix_socket.is_none());
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
listener:
  tcp_port: 0
  bind: "::1"
  sut_name: lab-node-3
collectors:
  exit_timeout: 15s
  defaults:
    ipmi-oob:
      user: admin
log_level: warn
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.listener.tcp_port, Some(0));
        assert_eq!(config.listener.bind, "::1");
        assert_eq!(config.listener.sut_name.as_deref(), Some("lab-node-3"));
        assert_eq!(config.collectors.exit_timeout, Duration::from_secs(15));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_both_socket_modes_rejected() {
        let config: AppConfig =
            serde_yaml::from_str("listener:\n  unix_socket: /tmp/a.sock\n  tcp_port: 9000\n")
                .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let config: AppConfig =
            serde_yaml::from_str("listener:\n  tcp_port: 9000\n  bind: somewhere\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            AppConfig::load("/nonexistent/stc-agent.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_load_malformed_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "listener: [unclosed").unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
