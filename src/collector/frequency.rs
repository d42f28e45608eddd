//! CPU frequency sampler.
//!
//! Wraps a turbostat-like tool that prints one block of per-CPU samples per
//! interval until interrupted.

use nix::sys::signal::Signal;

use super::property::Properties;
use super::source::Source;
use super::traits::{CollectorError, ToolProfile, interval_arg};

/// Columns requested from the sampler.
const COLUMNS: &str = "Time_Of_Day_Seconds,CPU,Bzy_MHz";

#[derive(Debug, Clone, Copy)]
pub struct FrequencySampler;

impl ToolProfile for FrequencySampler {
    fn source(&self) -> Source {
        Source::FrequencySampler
    }

    fn default_toolpath(&self) -> &'static str {
        "turbostat"
    }

    fn declare(&self, props: &mut Properties) {
        props.required_str("interval");
    }

    fn args(&self, props: &Properties) -> Result<Vec<String>, CollectorError> {
        Ok(vec![
            "--quiet".to_string(),
            "--show".to_string(),
            COLUMNS.to_string(),
            "--interval".to_string(),
            interval_arg(props)?,
        ])
    }

    // The sampler prints its summary on SIGINT.
    fn stop_signal(&self) -> Signal {
        Signal::SIGINT
    }
}
