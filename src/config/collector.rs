//! Collector configuration: exit timeout and per-source property defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::collector::{CollectorAdapter, CollectorRegistry, DEFAULT_EXIT_TIMEOUT, Source};

use super::validation::{ConfigError, expand_env_vars};

fn default_exit_timeout() -> Duration {
    DEFAULT_EXIT_TIMEOUT
}

/// Property defaults, keyed by source and then by property name.
pub type PropertyDefaults = BTreeMap<Source, BTreeMap<String, String>>;

/// Collectors configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// How long a signaled tool gets to exit (default: 10s).
    #[serde(default = "default_exit_timeout", with = "humantime_serde")]
    pub exit_timeout: Duration,

    /// Property values applied whenever a source is selected. String values
    /// support `${VAR}` and `${VAR:-default}` expansion.
    #[serde(default)]
    pub defaults: BTreeMap<Source, BTreeMap<String, Value>>,
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            exit_timeout: DEFAULT_EXIT_TIMEOUT,
            defaults: BTreeMap::new(),
        }
    }
}

/// Render a YAML scalar in the form property values take on the wire.
fn property_string(source: Source, key: &str, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(expand_env_vars(s)),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ConfigError::ValidationError(format!(
            "{source}.{key}: expected a string, number, or boolean"
        ))),
    }
}

impl CollectorsConfig {
    /// Resolve the defaults into raw property strings.
    pub fn property_defaults(&self) -> Result<PropertyDefaults, ConfigError> {
        let mut resolved = BTreeMap::new();
        for (source, props) in &self.defaults {
            let mut values = BTreeMap::new();
            for (key, value) in props {
                values.insert(key.clone(), property_string(*source, key, value)?);
            }
            resolved.insert(*source, values);
        }
        Ok(resolved)
    }

    /// Validate the timeout and that every default names a real property
    /// with a value of the right type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exit_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "collectors exit_timeout must be positive".to_string(),
            ));
        }

        for (source, props) in self.property_defaults()? {
            let mut adapter = CollectorAdapter::new(source);
            for (key, value) in &props {
                adapter.set_property(key, value).map_err(|e| {
                    ConfigError::ValidationError(format!("collectors.defaults.{source}: {e}"))
                })?;
            }
        }
        Ok(())
    }

    /// Build an empty registry carrying this configuration.
    pub fn build_registry(&self) -> Result<CollectorRegistry, ConfigError> {
        Ok(CollectorRegistry::new()
            .with_exit_timeout(self.exit_timeout)
            .with_defaults(self.property_defaults()?))
    }
}
