//! Core protocol types

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Length of the device identifier carried in every frame
pub const IDENTITY_LEN: usize = 6;

/// Offset of the first identity byte in any frame from the device
pub const IDENTITY_OFFSET: usize = 1;

/// Fan speed: low
pub const FAN_LOW: u8 = 1;
/// Fan speed: medium
pub const FAN_MEDIUM: u8 = 2;
/// Fan speed: high
pub const FAN_HIGH: u8 = 3;

/// Operating mode as reported by the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Off,
    Cool,
    Heat,
    Dry,
    FanOnly,
    Auto,
    /// Raw value outside the known set
    Unknown,
}

impl Mode {
    /// Every mode that can be commanded
    pub const ALL: [Mode; 6] = [
        Mode::Off,
        Mode::Cool,
        Mode::Heat,
        Mode::Dry,
        Mode::FanOnly,
        Mode::Auto,
    ];

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Mode::Off,
            1 => Mode::Cool,
            2 => Mode::Heat,
            3 => Mode::Dry,
            4 => Mode::FanOnly,
            254 => Mode::Auto,
            _ => Mode::Unknown,
        }
    }

    /// Wire value, `None` for [`Mode::Unknown`]
    pub fn raw(self) -> Option<u8> {
        match self {
            Mode::Off => Some(0),
            Mode::Cool => Some(1),
            Mode::Heat => Some(2),
            Mode::Dry => Some(3),
            Mode::FanOnly => Some(4),
            Mode::Auto => Some(254),
            Mode::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Cool => "cool",
            Mode::Heat => "heat",
            Mode::Dry => "dry",
            Mode::FanOnly => "fan_only",
            Mode::Auto => "auto",
            Mode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::InvalidMode(s.to_string()))
    }
}

/// Name of a fan speed byte, if it is one of the known speeds
pub fn fan_name(fan: u8) -> Option<&'static str> {
    match fan {
        FAN_LOW => Some("low"),
        FAN_MEDIUM => Some("medium"),
        FAN_HIGH => Some("high"),
        _ => None,
    }
}

/// Parse a fan speed given by name or as a raw byte
pub fn parse_fan(s: &str) -> Option<u8> {
    match s {
        "low" => Some(FAN_LOW),
        "medium" => Some(FAN_MEDIUM),
        "high" => Some(FAN_HIGH),
        other => other.parse().ok(),
    }
}

/// Decoded device status.
///
/// Replaced wholesale on every successful decode, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub mode: Mode,
    pub mode_raw: u8,
    pub fan_speed: u8,
    /// Room temperature in °C
    pub current_temperature: f64,
    /// Setpoint in °C
    pub target_temperature: f64,
    pub is_on: bool,
}

impl Status {
    /// Build a status from raw wire fields
    pub fn from_raw(mode_raw: u8, fan_speed: u8, current_centi: u16, target_centi: u16) -> Self {
        Self {
            mode: Mode::from_raw(mode_raw),
            mode_raw,
            fan_speed,
            current_temperature: f64::from(current_centi) / 100.0,
            target_temperature: f64::from(target_centi) / 100.0,
            // 254 (auto) counts as on, same as every other non-zero mode
            is_on: mode_raw != 0,
        }
    }
}

/// 6-byte identifier of an AC unit, learned from its own traffic
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity([u8; IDENTITY_LEN]);

impl DeviceIdentity {
    pub fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Extract the identity from bytes 1..=6 of an inbound frame
    pub fn from_frame(frame: &[u8]) -> Option<Self> {
        let bytes = frame.get(IDENTITY_OFFSET..IDENTITY_OFFSET + IDENTITY_LEN)?;
        let mut id = [0u8; IDENTITY_LEN];
        id.copy_from_slice(bytes);
        Some(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceIdentity({})", self)
    }
}

impl FromStr for DeviceIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != IDENTITY_LEN * 2 || !s.is_ascii() {
            return Err(Error::InvalidIdentity(s.to_string()));
        }

        let mut id = [0u8; IDENTITY_LEN];
        for (i, byte) in id.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidIdentity(s.to_string()))?;
        }
        Ok(Self(id))
    }
}

impl Serialize for DeviceIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_raw_mapping() {
        for mode in Mode::ALL {
            let raw = mode.raw().unwrap();
            assert_eq!(Mode::from_raw(raw), mode);
        }
        assert_eq!(Mode::from_raw(5), Mode::Unknown);
        assert_eq!(Mode::from_raw(253), Mode::Unknown);
        assert_eq!(Mode::Unknown.raw(), None);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("fan_only".parse::<Mode>().unwrap(), Mode::FanOnly);
        assert_eq!(Mode::Auto.to_string(), "auto");
        assert!("unknown".parse::<Mode>().is_err());
        assert!("turbo".parse::<Mode>().is_err());
    }

    #[test]
    fn test_is_on() {
        assert!(!Status::from_raw(0, 1, 2500, 2300).is_on);
        for raw in [1, 2, 3, 4, 254] {
            assert!(Status::from_raw(raw, 1, 2500, 2300).is_on);
        }
    }

    #[test]
    fn test_identity_hex() {
        let id = DeviceIdentity::new([0xac, 0xcf, 0x23, 0xaa, 0x31, 0x90]);
        assert_eq!(id.to_string(), "accf23aa3190");
        assert_eq!("accf23aa3190".parse::<DeviceIdentity>().unwrap(), id);
        assert!("accf23".parse::<DeviceIdentity>().is_err());
        assert!("zzcf23aa3190".parse::<DeviceIdentity>().is_err());
    }

    #[test]
    fn test_identity_from_short_frame() {
        assert!(DeviceIdentity::from_frame(&[0, 1, 2, 3, 4, 5]).is_none());
        let id = DeviceIdentity::from_frame(&[0, 1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(id.as_bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_fan_names() {
        assert_eq!(parse_fan("medium"), Some(FAN_MEDIUM));
        assert_eq!(parse_fan("5"), Some(5));
        assert_eq!(parse_fan("max"), None);
        assert_eq!(fan_name(FAN_HIGH), Some("high"));
        assert_eq!(fan_name(9), None);
    }
}
