//! In-band and out-of-band power management telemetry.
//!
//! Both variants wrap the same helper tool. The out-of-band variant talks to a
//! BMC over the network and needs its address and credentials.

use super::property::Properties;
use super::source::Source;
use super::traits::{CollectorError, ToolProfile, interval_arg};

/// Every helper output starts with its column header line.
pub const IPMI_HEADER_PREFIX: &[u8] = b"timestamp |";

const DEFAULT_TOOL: &str = "ipmi-helper";

fn declare_common(props: &mut Properties) {
    props
        .required_str("interval")
        .optional_int("retries", None)
        .optional_int("count", None);
}

fn common_args(props: &Properties) -> Result<Vec<String>, CollectorError> {
    let mut args = vec!["--interval".to_string(), interval_arg(props)?];
    for name in ["retries", "count"] {
        if let Some(value) = props.int(name) {
            if value < 0 {
                return Err(CollectorError::InvalidProperty {
                    property: name,
                    reason: format!("{value} is negative"),
                });
            }
            args.push(format!("--{name}"));
            args.push(value.to_string());
        }
    }
    Ok(args)
}

#[derive(Debug, Clone, Copy)]
pub struct IpmiInband;

impl ToolProfile for IpmiInband {
    fn source(&self) -> Source {
        Source::IpmiInband
    }

    fn default_toolpath(&self) -> &'static str {
        DEFAULT_TOOL
    }

    fn declare(&self, props: &mut Properties) {
        declare_common(props);
    }

    fn args(&self, props: &Properties) -> Result<Vec<String>, CollectorError> {
        common_args(props)
    }

    fn leading_marker(&self) -> Option<&'static [u8]> {
        Some(IPMI_HEADER_PREFIX)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IpmiOob;

impl ToolProfile for IpmiOob {
    fn source(&self) -> Source {
        Source::IpmiOob
    }

    fn default_toolpath(&self) -> &'static str {
        DEFAULT_TOOL
    }

    fn declare(&self, props: &mut Properties) {
        declare_common(props);
        props
            .required_str("host")
            .optional_str("user", None)
            .optional_str("password", None);
    }

    fn args(&self, props: &Properties) -> Result<Vec<String>, CollectorError> {
        let mut args = common_args(props)?;
        let host = props
            .str("host")
            .ok_or(CollectorError::MissingConfiguration("host"))?;
        args.extend(["--host".to_string(), host.to_string()]);
        for name in ["user", "password"] {
            if let Some(value) = props.str(name) {
                args.push(format!("--{name}"));
                args.push(value.to_string());
            }
        }
        Ok(args)
    }

    fn leading_marker(&self) -> Option<&'static [u8]> {
        Some(IPMI_HEADER_PREFIX)
    }

    fn secret_flags(&self) -> &'static [&'static str] {
        &["--password"]
    }
}
