//! Command vocabulary and response rendering.

use std::fmt;

use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Command verbs understood by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Verb {
    SetStats,
    SetCollectorProperty,
    Configure,
    Start,
    Stop,
    GetFailedCollectors,
    Exit,
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Select the statistics sources to collect.
    SetStats(String),
    /// Set a property on one collector or, with `*`, on all of them.
    SetCollectorProperty {
        target: String,
        key: String,
        value: String,
    },
    Configure,
    Start,
    Stop,
    GetFailedCollectors,
    Exit,
}

/// Why a message is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("bad command: {0}")]
    Unknown(String),

    #[error("{verb}: {reason}")]
    BadArguments { verb: Verb, reason: String },
}

impl Command {
    /// Parse a message into a command: a verb, then its raw argument string.
    ///
    /// A property value is kept exactly as sent after the space that ends the
    /// property name, so it may be empty or carry surrounding whitespace.
    pub fn parse(message: &str) -> Result<Self, ParseError> {
        let message = message.trim_start();
        let (word, raw_args) = message
            .split_once(char::is_whitespace)
            .unwrap_or((message, ""));
        let args = raw_args.trim();
        if word.is_empty() {
            return Err(ParseError::Empty);
        }
        let verb: Verb = word
            .parse()
            .map_err(|_| ParseError::Unknown(word.to_string()))?;

        let bad = |reason: &str| ParseError::BadArguments {
            verb,
            reason: reason.to_string(),
        };

        let command = match verb {
            Verb::SetStats => {
                if args.is_empty() {
                    return Err(bad("expected a comma-separated list of statistics"));
                }
                Self::SetStats(args.to_string())
            }
            Verb::SetCollectorProperty => {
                let mut parts = raw_args.trim_start().splitn(3, ' ');
                let (Some(target), Some(key), Some(value)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    return Err(bad("expected '<collector|*> <property> <value>'"));
                };
                if target.is_empty() || key.is_empty() {
                    return Err(bad("expected '<collector|*> <property> <value>'"));
                }
                Self::SetCollectorProperty {
                    target: target.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                }
            }
            _ if !args.is_empty() => return Err(bad("takes no arguments")),
            Verb::Configure => Self::Configure,
            Verb::Start => Self::Start,
            Verb::Stop => Self::Stop,
            Verb::GetFailedCollectors => Self::GetFailedCollectors,
            Verb::Exit => Self::Exit,
        };
        Ok(command)
    }

    pub fn verb(&self) -> Verb {
        match self {
            Self::SetStats(_) => Verb::SetStats,
            Self::SetCollectorProperty { .. } => Verb::SetCollectorProperty,
            Self::Configure => Verb::Configure,
            Self::Start => Verb::Start,
            Self::Stop => Verb::Stop,
            Self::GetFailedCollectors => Verb::GetFailedCollectors,
            Self::Exit => Verb::Exit,
        }
    }
}

/// Reply to exactly one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK`, optionally followed by a space and a payload.
    Ok(Option<String>),
    /// `error: <message>`.
    Error(String),
}

impl Response {
    pub fn ok() -> Self {
        Self::Ok(None)
    }

    pub fn ok_with(payload: impl Into<String>) -> Self {
        Self::Ok(Some(payload.into()))
    }

    /// Error response; multi-line messages are folded onto one line.
    pub fn error(message: impl fmt::Display) -> Self {
        let message = message.to_string();
        let folded = message
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Error(folded)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(None) => f.write_str("OK"),
            Self::Ok(Some(payload)) => write!(f, "OK {payload}"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}
