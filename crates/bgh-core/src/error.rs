//! Error types for the BGH wire protocol

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Received frame is too short to carry a status
    #[error("invalid status frame length: {len} bytes (need at least {min})")]
    FrameTooShort { len: usize, min: usize },

    /// Device identity could not be parsed
    #[error("invalid device identity: {0}")]
    InvalidIdentity(String),

    /// Mode name or raw value is not part of the protocol
    #[error("invalid mode: {0}")]
    InvalidMode(String),
}
