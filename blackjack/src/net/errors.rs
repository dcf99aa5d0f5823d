//! Network error types for framing and connection handling.

use std::{io, time::Duration};
use thiserror::Error;

/// A frame that could not be decoded. Always non-fatal to the server;
/// the offending connection is dropped (or, mid-turn, the frame ignored).
#[derive(Debug, Clone, Copy, Error, Eq, PartialEq)]
pub enum FrameError {
    /// Fewer bytes than the frame's fixed length
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Magic cookie mismatch
    #[error("bad magic cookie {0:#010x}")]
    BadCookie(u32),

    /// Message type tag doesn't match the expected frame kind
    #[error("bad message type: expected {expected:#04x}, got {actual:#04x}")]
    BadMessageType { expected: u8, actual: u8 },
}

/// Errors from a single player connection. Any of these removes exactly
/// that player from the table.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The connection was already closed by the server.
    #[error("connection closed")]
    Closed,

    #[error("protocol: {0}")]
    Protocol(#[from] FrameError),

    /// A well-formed frame with values the server won't accept.
    #[error("rejected: {0}")]
    Rejected(&'static str),
}

impl ConnectionError {
    /// Whether the peer simply hung up.
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io(error) if error.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Result type for connection operations
pub type Result<T> = std::result::Result<T, ConnectionError>;
