//! BGH Core
//!
//! Wire-level primitives for the BGH Smart Control air-conditioning protocol,
//! a fixed-layout binary protocol carried on UDP.
//!
//! This crate provides:
//! - Decoded device state ([`Status`], [`Mode`])
//! - The 6-byte device identifier used by write commands ([`DeviceIdentity`])
//! - Command encoding and status-frame decoding ([`codec`])
//!
//! Nothing in here touches the network; see `bgh-transport` and `bgh-client`.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{decode_status, encode_mode, encode_status_request, encode_temperature};
pub use error::{Error, Result};
pub use types::*;

/// UDP port the device listens on for commands
pub const DEFAULT_COMMAND_PORT: u16 = 20910;

/// UDP port the client binds to receive replies and broadcasts
pub const DEFAULT_LISTEN_PORT: u16 = 20911;

/// Source port the vendor app binds its command socket to
pub const VENDOR_SOURCE_PORT: u16 = 54563;

/// Lowest target temperature the unit accepts (°C)
pub const MIN_TEMPERATURE: f64 = 16.0;

/// Highest target temperature the unit accepts (°C)
pub const MAX_TEMPERATURE: f64 = 30.0;
