//! Configuration module for the statistics collection agent.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Listener settings (Unix socket path or TCP port, bind address, SUT name)
//! - Collector settings (exit timeout, per-source property defaults)
//! - Log filter
//!
//! Command-line flags and environment variables override file values; see
//! the binary's `--help`.

mod app;
mod collector;
mod validation;

pub use app::{AppConfig, DEFAULT_BIND, DEFAULT_LOG_LEVEL, ListenerConfig};
pub use collector::{CollectorsConfig, PropertyDefaults};
pub use validation::{ConfigError, expand_env_vars, parse_bind_address, parse_duration};
