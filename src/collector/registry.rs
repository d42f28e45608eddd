//! Collector registry: the selected adapters and their shared lifecycle.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use super::adapter::CollectorAdapter;
use super::source::{Source, parse_selection};
use super::traits::{CollectorError, DEFAULT_EXIT_TIMEOUT};

/// Target of `set_property` that addresses every selected collector.
pub const WILDCARD: &str = "*";

/// Lifecycle step an adapter error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Method {
    SetProperty,
    Configure,
    Start,
    End,
    Save,
    Validate,
}

/// Errors raised by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no collectors selected, use set-stats first")]
    NoCollectors,

    #[error("empty statistics selection")]
    EmptySelection,

    #[error("collectors are already started")]
    AlreadyStarted,

    #[error("collectors are not started")]
    NotStarted,

    #[error("unknown collector '{0}'")]
    UnknownCollector(String),

    #[error("malformed property name '{0}'")]
    MalformedKey(String),

    /// No selected collector declares the property.
    #[error("no selected collector has property '{0}'")]
    UnknownProperty(String),

    /// A non-fallible adapter failed.
    #[error("{collector}: {method} failed: {source}")]
    Collector {
        collector: Source,
        method: Method,
        #[source]
        source: CollectorError,
    },
}

/// Check a property name against `[a-z][a-z0-9_-]*`.
fn is_valid_key(key: &str) -> bool {
    static KEY_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = KEY_REGEX
        .get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("failed to compile key regex"));
    regex.is_match(key)
}

/// Apply the partial-failure policy to one adapter result.
///
/// Returns `Ok(true)` on success and `Ok(false)` when a fallible adapter
/// failed and was recorded.
fn record(
    failed: &mut Vec<Source>,
    adapter: &CollectorAdapter,
    method: Method,
    result: Result<(), CollectorError>,
) -> Result<bool, RegistryError> {
    let Err(source) = result else {
        return Ok(true);
    };
    let collector = adapter.source();

    if adapter.is_fallible() {
        tracing::warn!(
            collector = %collector,
            method = %method,
            error = %source,
            "Fallible collector failed, skipping it from now on"
        );
        if !failed.contains(&collector) {
            failed.push(collector);
        }
        return Ok(false);
    }

    tracing::error!(collector = %collector, method = %method, error = %source, "Collector failed");
    Err(RegistryError::Collector {
        collector,
        method,
        source,
    })
}

/// The active set of collector adapters.
///
/// Lifecycle calls fan out over the adapters in selection order. A single
/// owner drives the registry, so no locking is involved.
pub struct CollectorRegistry {
    collectors: Vec<CollectorAdapter>,
    failed: Vec<Source>,
    started: bool,
    exit_timeout: Duration,
    defaults: BTreeMap<Source, BTreeMap<String, String>>,
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("collectors", &self.selected())
            .field("failed", &self.failed)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl CollectorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
            failed: Vec::new(),
            started: false,
            exit_timeout: DEFAULT_EXIT_TIMEOUT,
            defaults: BTreeMap::new(),
        }
    }

    /// Set the exit timeout given to every adapter.
    pub fn with_exit_timeout(mut self, exit_timeout: Duration) -> Self {
        self.exit_timeout = exit_timeout;
        self
    }

    /// Set property values applied to adapters when they are created.
    pub fn with_defaults(mut self, defaults: BTreeMap<Source, BTreeMap<String, String>>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Selected sources, in selection order.
    pub fn selected(&self) -> Vec<Source> {
        self.collectors.iter().map(CollectorAdapter::source).collect()
    }

    /// Sources of fallible collectors that failed since the last `create`.
    pub fn failed(&self) -> &[Source] {
        &self.failed
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Adapter for `source`, if selected.
    pub fn collector(&self, source: Source) -> Option<&CollectorAdapter> {
        self.collectors.iter().find(|c| c.source() == source)
    }

    fn require_collectors(&self) -> Result<(), RegistryError> {
        if self.collectors.is_empty() {
            return Err(RegistryError::NoCollectors);
        }
        Ok(())
    }

    fn require_idle(&self) -> Result<(), RegistryError> {
        self.require_collectors()?;
        if self.started {
            return Err(RegistryError::AlreadyStarted);
        }
        Ok(())
    }

    /// Replace the adapter set with the sources named in `selection`.
    pub fn create(&mut self, selection: &str) -> Result<(), RegistryError> {
        if self.started {
            return Err(RegistryError::AlreadyStarted);
        }
        let sources = parse_selection(selection).map_err(RegistryError::UnknownCollector)?;
        if sources.is_empty() {
            return Err(RegistryError::EmptySelection);
        }

        let mut collectors = Vec::with_capacity(sources.len());
        for source in sources {
            let mut adapter = CollectorAdapter::new(source).with_exit_timeout(self.exit_timeout);
            for (key, value) in self.defaults.get(&source).into_iter().flatten() {
                adapter
                    .set_property(key, value)
                    .map_err(|source_err| RegistryError::Collector {
                        collector: source,
                        method: Method::SetProperty,
                        source: source_err,
                    })?;
            }
            collectors.push(adapter);
        }

        self.collectors = collectors;
        self.failed.clear();
        tracing::info!(collectors = ?self.selected(), "Collectors selected");
        Ok(())
    }

    /// Set `key` to `value` on one collector, or on every collector for `*`.
    ///
    /// Under the wildcard, failed collectors and collectors that do not
    /// declare `key` are skipped; it is an error only if nothing declares it.
    pub fn set_property(&mut self, target: &str, key: &str, value: &str) -> Result<(), RegistryError> {
        self.require_idle()?;
        if !is_valid_key(key) {
            return Err(RegistryError::MalformedKey(key.to_string()));
        }

        let set = |adapter: &mut CollectorAdapter| {
            let collector = adapter.source();
            adapter
                .set_property(key, value)
                .map_err(|source| RegistryError::Collector {
                    collector,
                    method: Method::SetProperty,
                    source,
                })
        };

        if target == WILDCARD {
            let mut applied = 0;
            for adapter in self
                .collectors
                .iter_mut()
                .filter(|c| !self.failed.contains(&c.source()))
            {
                if adapter.properties().contains(key) {
                    set(adapter)?;
                    applied += 1;
                }
            }
            if applied == 0 {
                return Err(RegistryError::UnknownProperty(key.to_string()));
            }
            tracing::debug!(key, value, applied, "Property set on all collectors");
            return Ok(());
        }

        let source = Source::from_str(target)
            .map_err(|_| RegistryError::UnknownCollector(target.to_string()))?;
        let adapter = self
            .collectors
            .iter_mut()
            .find(|c| c.source() == source)
            .ok_or_else(|| RegistryError::UnknownCollector(target.to_string()))?;
        set(adapter)?;
        tracing::debug!(collector = %source, key, value, "Property set");
        Ok(())
    }

    /// Configure every non-failed collector, then clean up its stale processes.
    pub async fn configure(&mut self) -> Result<(), RegistryError> {
        self.require_idle()?;

        for adapter in &mut self.collectors {
            if self.failed.contains(&adapter.source()) {
                continue;
            }
            let result = adapter.configure().await;
            if record(&mut self.failed, adapter, Method::Configure, result)? {
                adapter.kill_stale().await;
            }
        }
        tracing::info!(failed = ?self.failed, "Collectors configured");
        Ok(())
    }

    /// Start every non-failed collector.
    ///
    /// When a non-fallible collector fails to start, the collectors already
    /// started by this call are killed again and the registry stays stopped.
    pub async fn start(&mut self) -> Result<(), RegistryError> {
        self.require_idle()?;

        let mut outcome = Ok(());
        for adapter in &mut self.collectors {
            if self.failed.contains(&adapter.source()) {
                continue;
            }
            let result = adapter.start().await;
            if let Err(e) = record(&mut self.failed, adapter, Method::Start, result) {
                outcome = Err(e);
                break;
            }
        }

        if let Err(e) = outcome {
            self.abort_running().await;
            return Err(e);
        }

        self.started = true;
        tracing::info!(failed = ?self.failed, "Collectors started");
        Ok(())
    }

    /// Stop, save, and validate every non-failed collector, in that order per
    /// collector.
    ///
    /// The registry is no longer started afterwards, whatever the outcome. If
    /// a non-fallible collector fails, collectors still running are killed.
    pub async fn stop(&mut self) -> Result<(), RegistryError> {
        self.require_collectors()?;
        if !self.started {
            return Err(RegistryError::NotStarted);
        }
        self.started = false;

        let mut outcome = Ok(());
        'collectors: for adapter in &mut self.collectors {
            if self.failed.contains(&adapter.source()) {
                continue;
            }
            for method in [Method::End, Method::Save, Method::Validate] {
                let result = match method {
                    Method::End => adapter.end().await,
                    Method::Save => adapter.save().await,
                    _ => adapter.validate(),
                };
                match record(&mut self.failed, adapter, method, result) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        outcome = Err(e);
                        break 'collectors;
                    }
                }
            }
        }

        self.abort_running().await;
        if outcome.is_ok() {
            tracing::info!(failed = ?self.failed, "Collectors stopped");
        }
        outcome
    }

    /// Kill every collector that is still running.
    async fn abort_running(&mut self) {
        for adapter in &mut self.collectors {
            if adapter.is_running() {
                tracing::warn!(collector = %adapter.source(), "Killing collector");
                adapter.abort().await;
            }
        }
    }

    /// Stop a started registry on service exit, and kill anything left
    /// running. Errors are only logged.
    pub async fn shutdown(&mut self) {
        if self.started {
            tracing::info!("Stopping collectors on shutdown");
            if let Err(e) = self.stop().await {
                tracing::warn!(error = %e, "Collectors did not stop cleanly");
            }
        }
        self.abort_running().await;
    }
}
