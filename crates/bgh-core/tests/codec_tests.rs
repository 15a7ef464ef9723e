//! Codec tests for bgh-core
//!
//! Covers:
//! - Setpoint encoding against decoded replies across the accepted range
//! - Frame length validation
//! - Unknown mode handling
//! - Identity extraction from inbound frames

use bgh_core::codec::{self, CMD_TEMPERATURE_OFFSET, MIN_STATUS_LEN};
use bgh_core::{decode_status, encode_temperature, DeviceIdentity, Mode, Status};

/// Build a status frame the way the unit lays it out
fn status_frame(identity: [u8; 6], mode: u8, fan: u8, current: u16, target: u16) -> Vec<u8> {
    let mut frame = vec![0u8; MIN_STATUS_LEN];
    frame[1..7].copy_from_slice(&identity);
    frame[18] = mode;
    frame[19] = fan;
    frame[21..23].copy_from_slice(&current.to_le_bytes());
    frame[23..25].copy_from_slice(&target.to_le_bytes());
    frame
}

// ============================================================================
// Setpoint Tests
// ============================================================================

#[test]
fn test_setpoint_survives_reply_across_range() {
    let identity = DeviceIdentity::new([1, 2, 3, 4, 5, 6]);

    let mut t = bgh_core::MIN_TEMPERATURE;
    while t <= bgh_core::MAX_TEMPERATURE {
        let cmd = encode_temperature(&identity, 1, 1, t);
        let centi = u16::from_le_bytes([cmd[CMD_TEMPERATURE_OFFSET], cmd[CMD_TEMPERATURE_OFFSET + 1]]);

        let reply = status_frame(*identity.as_bytes(), 1, 1, 2400, centi);
        let status = decode_status(&reply).expect("decode failed");

        assert!(
            (status.target_temperature - t).abs() < 0.01,
            "setpoint {} decoded as {}",
            t,
            status.target_temperature
        );
        t += 0.5;
    }
}

#[test]
fn test_fractional_setpoint() {
    let identity = DeviceIdentity::new([0; 6]);
    let cmd = encode_temperature(&identity, 2, 3, 24.25);
    assert_eq!(
        u16::from_le_bytes([cmd[20], cmd[21]]),
        2425,
        "setpoint should be hundredths of a degree"
    );
}

// ============================================================================
// Length Validation Tests
// ============================================================================

#[test]
fn test_every_short_length_is_rejected() {
    for len in 0..MIN_STATUS_LEN {
        let frame = vec![1u8; len];
        assert!(
            decode_status(&frame).is_err(),
            "{}-byte frame should be rejected",
            len
        );
    }
}

#[test]
fn test_longer_frames_are_accepted() {
    let mut frame = status_frame([9; 6], 3, 1, 2210, 2400);
    frame.extend_from_slice(&[0xff; 16]);

    let status = decode_status(&frame).expect("decode failed");
    assert_eq!(status.mode, Mode::Dry);
    assert_eq!(status.current_temperature, 22.1);
}

// ============================================================================
// Mode Tests
// ============================================================================

#[test]
fn test_unknown_mode_keeps_raw_fields() {
    let frame = status_frame([9; 6], 7, 2, 2500, 2300);
    let status = decode_status(&frame).expect("unknown mode must not be rejected");

    assert_eq!(status.mode, Mode::Unknown);
    assert_eq!(status.mode_raw, 7);
    assert_eq!(status.fan_speed, 2);
    assert!(status.is_on);
}

#[test]
fn test_known_modes() {
    let cases = [
        (0, Mode::Off, false),
        (1, Mode::Cool, true),
        (2, Mode::Heat, true),
        (3, Mode::Dry, true),
        (4, Mode::FanOnly, true),
        (254, Mode::Auto, true),
    ];

    for (raw, mode, on) in cases {
        let status = decode_status(&status_frame([0; 6], raw, 1, 0, 0)).unwrap();
        assert_eq!(status.mode, mode);
        assert_eq!(status.is_on, on, "is_on for mode {}", raw);
    }
}

#[test]
fn test_status_serializes_symbolic_mode() {
    let status = Status::from_raw(4, 3, 2650, 2200);
    let json = serde_json::to_value(&status).unwrap();

    assert_eq!(json["mode"], "fan_only");
    assert_eq!(json["mode_raw"], 4);
    assert_eq!(json["target_temperature"], 22.0);
}

// ============================================================================
// Identity Tests
// ============================================================================

#[test]
fn test_identity_from_status_frame() {
    let frame = status_frame([0xac, 0xcf, 0x23, 0x10, 0x20, 0x30], 1, 1, 0, 0);
    let identity = DeviceIdentity::from_frame(&frame).expect("identity");

    assert_eq!(identity.to_string(), "accf23102030");
}

#[test]
fn test_write_command_embeds_identity() {
    let identity: DeviceIdentity = "accf23102030".parse().unwrap();
    let cmd = codec::encode_mode(&identity, 0, 1);

    assert_eq!(DeviceIdentity::from_frame(&cmd[6..]), Some(identity));
}
