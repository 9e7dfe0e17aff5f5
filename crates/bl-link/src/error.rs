//! Error types for link operations.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors raised by the transport, framing and channel layers.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The single connect attempt failed.
    #[error("Failed to connect to {addr}")]
    Connect { addr: String, source: io::Error },

    /// Writing to the peer failed; the link is closed afterwards.
    #[error("Failed to send message")]
    SendFailed { source: io::Error },

    /// The link was already closed by an earlier failure or by the peer.
    #[error("Link is closed")]
    Closed,

    #[error("Failed to start receiver thread")]
    Spawn { source: io::Error },

    #[error("Frame is not valid UTF-8")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("Frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] bl_core::CoreError),
}
