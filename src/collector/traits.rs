//! Core collector traits and types.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use nix::sys::signal::Signal;
use thiserror::Error;

use super::property::{Properties, PropertyKind};
use super::source::Source;

/// Default time `save` waits for a signaled tool to exit (10 seconds).
pub const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised by a single collector adapter.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// A required property was never set.
    #[error("required property '{0}' is not set")]
    MissingConfiguration(&'static str),

    /// An output or log directory is unusable.
    #[error("bad path '{}': {reason}", .path.display())]
    PathError { path: PathBuf, reason: String },

    /// `start` was called without a successful `configure` since the last run.
    #[error("collector is not configured")]
    NotConfigured,

    /// The tool is already running.
    #[error("collector is already running")]
    AlreadyRunning,

    /// The tool is not running.
    #[error("collector is not running")]
    NotRunning,

    /// The tool exited before it was told to stop.
    #[error("'{command}' exited prematurely ({status})")]
    PrematureExit { command: String, status: ExitStatus },

    /// The process group could not be resolved or signaled.
    #[error("failed to signal '{command}': {reason}")]
    SignalError { command: String, reason: String },

    /// The tool did not exit after being signaled.
    #[error("'{command}' did not exit within {}", humantime::format_duration(*.timeout))]
    ExitTimeout { command: String, timeout: Duration },

    /// The output file does not carry the expected marker bytes.
    #[error(
        "corrupt output in '{}': expected {position} bytes '{expected}', got '{actual}'",
        .path.display()
    )]
    CorruptOutput {
        path: PathBuf,
        position: &'static str,
        expected: String,
        actual: String,
    },

    /// The property is not declared by this collector.
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    /// The raw value does not coerce to the property's type.
    #[error("bad value '{value}' for property '{property}': expected {expected}")]
    PropertyTypeError {
        property: String,
        expected: PropertyKind,
        value: String,
    },

    /// Properties cannot change while the tool runs.
    #[error("cannot change property '{0}' while the collector is running")]
    PropertyLocked(String),

    /// The value has the right type but is out of range.
    #[error("invalid value for property '{property}': {reason}")]
    InvalidProperty {
        property: &'static str,
        reason: String,
    },

    /// A one-shot helper command failed.
    #[error("'{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// The tool could not be launched.
    #[error("failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// File I/O failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source-specific behavior of a collector adapter.
///
/// The adapter owns the generic lifecycle (output file, child process, stale
/// process cleanup). A profile only describes the wrapped tool: which extra
/// properties it takes, how its command line is built, what its output looks
/// like, and how it is stopped.
#[async_trait::async_trait]
pub trait ToolProfile: Send + Sync + std::fmt::Debug {
    /// Statistics source this profile describes.
    fn source(&self) -> Source;

    /// Tool used when the `toolpath` property is not overridden.
    fn default_toolpath(&self) -> &'static str;

    /// Declare the source-specific properties.
    fn declare(&self, props: &mut Properties);

    /// Arguments passed to the tool after its path.
    fn args(&self, props: &Properties) -> Result<Vec<String>, CollectorError>;

    /// Bytes the output must start with.
    fn leading_marker(&self) -> Option<&'static [u8]> {
        None
    }

    /// Bytes the output must end with.
    fn trailing_marker(&self) -> Option<&'static [u8]> {
        None
    }

    /// Signal delivered to the tool's process group by `end`.
    fn stop_signal(&self) -> Signal {
        Signal::SIGTERM
    }

    /// Flags whose following argument may differ between two runs that are
    /// otherwise the same collection.
    fn varying_flags(&self) -> &'static [&'static str] {
        &["--interval"]
    }

    /// Flags whose following argument must not be logged.
    fn secret_flags(&self) -> &'static [&'static str] {
        &[]
    }

    /// One-shot side effect run at configure time, before the output file is
    /// opened.
    async fn prepare(
        &self,
        _toolpath: &str,
        _props: &Properties,
        _timeout: Duration,
    ) -> Result<(), CollectorError> {
        Ok(())
    }
}

/// Read the required `interval` property and check it is a positive number
/// of seconds.
pub(crate) fn interval_arg(props: &Properties) -> Result<String, CollectorError> {
    let raw = props
        .str("interval")
        .ok_or(CollectorError::MissingConfiguration("interval"))?;

    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(raw.trim().to_string()),
        _ => Err(CollectorError::InvalidProperty {
            property: "interval",
            reason: format!("'{raw}' is not a positive number of seconds"),
        }),
    }
}

/// Render a command line for logs, masking arguments that follow a secret flag.
pub(crate) fn render_command(argv: &[String], secret_flags: &[&str]) -> String {
    let mut rendered = Vec::with_capacity(argv.len());
    let mut mask_next = false;
    for arg in argv {
        if mask_next {
            rendered.push("***");
            mask_next = false;
            continue;
        }
        mask_next = secret_flags.contains(&arg.as_str());
        rendered.push(arg.as_str());
    }
    rendered.join(" ")
}
