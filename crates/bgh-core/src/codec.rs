//! Command encoding and status-frame decoding
//!
//! Write command layout (22 bytes):
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Bytes 0-6:    0x00 padding                                    │
//! │ Bytes 7-12:   Device identity                                 │
//! │ Bytes 13-21:  Command suffix (mode/fan or temperature)        │
//! │               byte 17 = mode, byte 18 = fan                   │
//! │               bytes 20-21 = setpoint, u16 LE centidegrees     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status frame layout (25 bytes minimum):
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Byte 0:       (ignored)                                       │
//! │ Bytes 1-6:    Device identity                                 │
//! │ Byte 18:      Mode                                            │
//! │ Byte 19:      Fan speed                                       │
//! │ Bytes 21-22:  Room temperature, u16 LE centidegrees           │
//! │ Bytes 23-24:  Setpoint, u16 LE centidegrees                   │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::types::{DeviceIdentity, Status, IDENTITY_LEN};

/// Status request, sent as-is
pub const STATUS_REQUEST: [u8; 17] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xac, 0xcf, 0x23, 0xaa, 0x31, 0x90, 0x59, 0x00,
    0x01, 0xe4,
];

/// Suffix of a mode/fan write command
pub const MODE_SUFFIX: [u8; 9] = [0xf6, 0x00, 0x01, 0x61, 0x04, 0x02, 0x00, 0x00, 0x80];

/// Suffix of a temperature write command
pub const TEMPERATURE_SUFFIX: [u8; 9] = [0x81, 0x00, 0x01, 0x61, 0x01, 0x00, 0x00, 0x00, 0x00];

/// Zero padding ahead of the identity in write commands
pub const WRITE_PADDING: usize = 7;

/// Total length of a write command
pub const WRITE_FRAME_LEN: usize = WRITE_PADDING + IDENTITY_LEN + MODE_SUFFIX.len();

pub const CMD_MODE_OFFSET: usize = 17;
pub const CMD_FAN_OFFSET: usize = 18;
pub const CMD_TEMPERATURE_OFFSET: usize = 20;

pub const STATUS_MODE_OFFSET: usize = 18;
pub const STATUS_FAN_OFFSET: usize = 19;
pub const STATUS_CURRENT_TEMP_OFFSET: usize = 21;
pub const STATUS_TARGET_TEMP_OFFSET: usize = 23;

/// Shortest frame that carries every status field
pub const MIN_STATUS_LEN: usize = 25;

/// Encode a status request
pub fn encode_status_request() -> Bytes {
    Bytes::from_static(&STATUS_REQUEST)
}

/// Encode a mode/fan write command
pub fn encode_mode(identity: &DeviceIdentity, mode: u8, fan: u8) -> Bytes {
    let mut buf = write_template(identity, &MODE_SUFFIX);
    buf[CMD_MODE_OFFSET] = mode;
    buf[CMD_FAN_OFFSET] = fan;
    buf.freeze()
}

/// Encode a setpoint write command.
///
/// The unit expects the current mode and fan alongside the setpoint.
pub fn encode_temperature(identity: &DeviceIdentity, mode: u8, fan: u8, celsius: f64) -> Bytes {
    let mut buf = write_template(identity, &TEMPERATURE_SUFFIX);
    buf[CMD_MODE_OFFSET] = mode;
    buf[CMD_FAN_OFFSET] = fan;
    let [lo, hi] = centidegrees(celsius).to_le_bytes();
    buf[CMD_TEMPERATURE_OFFSET] = lo;
    buf[CMD_TEMPERATURE_OFFSET + 1] = hi;
    buf.freeze()
}

/// Convert °C to the wire's hundredths of a degree, saturating at the u16 range
pub fn centidegrees(celsius: f64) -> u16 {
    let raw = (celsius * 100.0).round();
    if raw.is_nan() || raw <= 0.0 {
        0
    } else if raw >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        raw as u16
    }
}

/// Decode a status frame
pub fn decode_status(frame: &[u8]) -> Result<Status> {
    if frame.len() < MIN_STATUS_LEN {
        return Err(Error::FrameTooShort {
            len: frame.len(),
            min: MIN_STATUS_LEN,
        });
    }

    Ok(Status::from_raw(
        frame[STATUS_MODE_OFFSET],
        frame[STATUS_FAN_OFFSET],
        read_u16_le(frame, STATUS_CURRENT_TEMP_OFFSET),
        read_u16_le(frame, STATUS_TARGET_TEMP_OFFSET),
    ))
}

fn read_u16_le(frame: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([frame[offset], frame[offset + 1]])
}

fn write_template(identity: &DeviceIdentity, suffix: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(WRITE_FRAME_LEN);
    buf.put_bytes(0, WRITE_PADDING);
    buf.put_slice(identity.as_bytes());
    buf.put_slice(suffix);
    buf
}
