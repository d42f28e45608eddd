//! Delimiter framing for command and response messages.
//!
//! A message is UTF-8 text followed by a line holding only `--`. Lines may end
//! in `\n` or `\r\n`. The newline before the delimiter line is not part of the
//! message.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::error::{MAX_MESSAGE_SIZE, ProtocolError};

/// Delimiter line content.
pub const DELIMITER: &[u8] = b"--";

/// Codec turning a byte stream into `--`-terminated messages.
///
/// Decoding keeps its scan position across calls, so each received chunk is
/// only inspected once.
#[derive(Debug, Default)]
pub struct MessageCodec {
    /// Bytes of the buffer already searched for newlines.
    scan: usize,
    /// Start of the line currently being received.
    line_start: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.scan = 0;
        self.line_start = 0;
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl Decoder for MessageCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if self.scan > src.len() {
            // The buffer was replaced or drained behind our back.
            self.reset();
        }
        while let Some(offset) = src[self.scan..].iter().position(|b| *b == b'\n') {
            let newline = self.scan + offset;
            if strip_cr(&src[self.line_start..newline]) != DELIMITER {
                self.line_start = newline + 1;
                self.scan = newline + 1;
                continue;
            }

            let body_end = self.line_start;
            let frame = src.split_to(newline + 1);
            self.reset();

            let mut body = &frame[..body_end];
            if let Some(rest) = body.strip_suffix(b"\n") {
                body = strip_cr(rest);
            }
            if body.len() > MAX_MESSAGE_SIZE {
                return Err(ProtocolError::FrameTooLarge {
                    size: body.len(),
                    max: MAX_MESSAGE_SIZE,
                });
            }
            return Ok(Some(std::str::from_utf8(body)?.to_string()));
        }
        self.scan = src.len();

        // Leave room for a pending `\r\n--\r` tail.
        if src.len() > MAX_MESSAGE_SIZE + 5 {
            return Err(ProtocolError::FrameTooLarge {
                size: src.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => {
                src.clear();
                self.reset();
                Err(ProtocolError::Disconnected)
            }
        }
    }
}

impl Encoder<String> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if message.lines().any(|line| strip_cr(line.as_bytes()) == DELIMITER) {
            return Err(ProtocolError::InvalidFrame {
                reason: "message contains a delimiter line".to_string(),
            });
        }
        if message.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: message.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        dst.reserve(message.len() + 4);
        dst.put_slice(message.as_bytes());
        if !message.is_empty() && !message.ends_with('\n') {
            dst.put_u8(b'\n');
        }
        dst.put_slice(DELIMITER);
        dst.put_u8(b'\n');
        Ok(())
    }
}
