//! AC power meter reader.
//!
//! The meter is programmed once at configure time (`set interval`), then read
//! continuously by a separate invocation.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use super::property::Properties;
use super::source::Source;
use super::traits::{CollectorError, ToolProfile, interval_arg};

/// Default meter sampling interval in seconds.
const DEFAULT_INTERVAL: &str = "1";

/// Quantities read from the meter: time and active power.
const READ_ITEMS: &str = "T,P";

#[derive(Debug, Clone, Copy)]
pub struct AcPower;

impl AcPower {
    /// Arguments selecting the meter, shared by both invocations.
    fn device_args(props: &Properties) -> Result<Vec<String>, CollectorError> {
        let devnode = props
            .str("devnode")
            .ok_or(CollectorError::MissingConfiguration("devnode"))?;

        let mut args = Vec::new();
        if let Some(pmtype) = props.str("pmtype") {
            args.push("--pmtype".to_string());
            args.push(pmtype.to_string());
        }
        args.push(devnode.to_string());
        Ok(args)
    }
}

#[async_trait::async_trait]
impl ToolProfile for AcPower {
    fn source(&self) -> Source {
        Source::AcPower
    }

    fn default_toolpath(&self) -> &'static str {
        "yokotool"
    }

    fn declare(&self, props: &mut Properties) {
        props
            .required_str("devnode")
            .optional_str("pmtype", None)
            .optional_str("interval", Some(DEFAULT_INTERVAL));
    }

    fn args(&self, props: &Properties) -> Result<Vec<String>, CollectorError> {
        let mut args = Self::device_args(props)?;
        args.extend([
            "read".to_string(),
            "--count=0".to_string(),
            READ_ITEMS.to_string(),
        ]);
        Ok(args)
    }

    async fn prepare(
        &self,
        toolpath: &str,
        props: &Properties,
        limit: Duration,
    ) -> Result<(), CollectorError> {
        let mut args = Self::device_args(props)?;
        args.extend([
            "set".to_string(),
            "interval".to_string(),
            interval_arg(props)?,
        ]);
        let command = format!("{toolpath} {}", args.join(" "));
        tracing::debug!(command = %command, "Programming AC power meter");

        let output = Command::new(toolpath)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = timeout(limit, output)
            .await
            .map_err(|_| CollectorError::CommandFailed {
                command: command.clone(),
                reason: format!("timed out after {}", humantime::format_duration(limit)),
            })?
            .map_err(|source| CollectorError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollectorError::CommandFailed {
                command,
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}
