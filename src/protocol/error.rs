//! Protocol error types for the command session layer.

use std::io;

use thiserror::Error;

/// Maximum message size in bytes (64 KiB), delimiter excluded.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Errors raised while reading or writing framed messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message is not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// The peer closed the connection, possibly mid-message.
    #[error("peer disconnected")]
    Disconnected,

    /// No delimiter line within [`MAX_MESSAGE_SIZE`] bytes.
    #[error("message too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// An outgoing message cannot be framed.
    #[error("invalid frame: {reason}")]
    InvalidFrame { reason: String },

    /// Underlying transport error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
