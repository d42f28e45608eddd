//! Supported statistics sources and `set-stats` selection parsing.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::acpower::AcPower;
use super::frequency::FrequencySampler;
use super::ipmi::{IpmiInband, IpmiOob};
use super::traits::ToolProfile;

/// A statistics source this agent knows how to collect.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Source {
    /// CPU frequency sampler (turbostat-like).
    FrequencySampler,
    /// In-band power management telemetry.
    IpmiInband,
    /// Out-of-band power management telemetry over the network.
    IpmiOob,
    /// AC power meter reader.
    #[serde(rename = "acpower")]
    #[strum(serialize = "acpower")]
    AcPower,
}

impl Source {
    /// Every supported source, in canonical order.
    pub const ALL: [Source; 4] = [
        Source::FrequencySampler,
        Source::IpmiInband,
        Source::IpmiOob,
        Source::AcPower,
    ];

    /// Build the tool profile for this source.
    pub fn profile(self) -> Box<dyn ToolProfile> {
        match self {
            Self::FrequencySampler => Box::new(FrequencySampler),
            Self::IpmiInband => Box::new(IpmiInband),
            Self::IpmiOob => Box::new(IpmiOob),
            Self::AcPower => Box::new(AcPower),
        }
    }

    /// Name of the raw output file.
    pub fn output_file_name(self) -> String {
        format!("{self}.raw.txt")
    }

    /// Name of the command log file.
    pub fn command_log_name(self) -> String {
        format!("{self}.cmd.txt")
    }
}

/// Parse a comma-separated source selection.
///
/// `all` selects every supported source and `!name` excludes one. Order
/// follows first mention; duplicates are dropped.
///
/// # Errors
/// Returns the offending name if it is not a supported source.
pub fn parse_selection(input: &str) -> Result<Vec<Source>, String> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if name == "all" {
            include.extend(Source::ALL);
        } else if let Some(excluded) = name.strip_prefix('!') {
            exclude.push(Source::from_str(excluded).map_err(|_| excluded.to_string())?);
        } else {
            include.push(Source::from_str(name).map_err(|_| name.to_string())?);
        }
    }

    let mut selected = Vec::new();
    for source in include {
        if !exclude.contains(&source) && !selected.contains(&source) {
            selected.push(source);
        }
    }
    Ok(selected)
}
