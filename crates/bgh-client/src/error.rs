//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    /// Device identity unknown after the grace wait
    #[error("device not ready: identity not learned within {0:?}")]
    DeviceNotReady(std::time::Duration),

    #[error("invalid host: {0}")]
    InvalidHost(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] bgh_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] bgh_transport::TransportError),
}
