//! Session Protocol
//!
//! Text commands and responses framed by a `--` delimiter line. A session
//! reads one command, dispatches it to the [`CollectorRegistry`], and answers
//! with `OK[ payload]` or `error: message` before reading the next one.
//!
//! - [`MessageCodec`]: incremental delimiter framing over any byte stream
//! - [`Command`] / [`Response`]: command vocabulary and reply rendering
//! - [`Session`]: the read, dispatch, respond loop for one connection
//!
//! [`CollectorRegistry`]: crate::collector::CollectorRegistry

mod codec;
mod command;
mod error;
mod session;

pub use codec::{DELIMITER, MessageCodec};
pub use command::{Command, ParseError, Response, Verb};
pub use error::{MAX_MESSAGE_SIZE, ProtocolError};
pub use session::{Session, SessionEnd, dispatch};
