//! Codec behavior with a caller-supplied engine. Uses only the core API, so
//! it runs under `--no-default-features` as well.

use idtp_frame::{
    CrcScope, FrameCodec, FrameError, Header, ImuQuat, IntegrityEngine, Mode, Payload,
    ParseErrorKind, Result, HEADER_SIZE, HMAC_TAG_SIZE,
};

/// Additive checksums and a key-mixed tag; stands in for a hardware unit.
struct SummingEngine;

impl IntegrityEngine for SummingEngine {
    fn crc8(&self, data: &[u8]) -> u8 {
        data.iter().fold(0x5Au8, |acc, b| acc.wrapping_add(*b))
    }

    fn crc32(&self, data: &[u8]) -> u32 {
        data.iter()
            .fold(0xC0DE_0000u32, |acc, b| acc.rotate_left(5) ^ u32::from(*b))
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; HMAC_TAG_SIZE]> {
        let mut tag = [0u8; HMAC_TAG_SIZE];
        for (i, b) in data.iter().enumerate() {
            tag[i % HMAC_TAG_SIZE] ^= b.wrapping_add(key[i % key.len()]);
        }
        Ok(tag)
    }
}

fn header(mode: Mode, sequence: u32) -> Header {
    Header {
        device_id: 0x0B0B,
        sequence,
        mode: mode.into(),
        payload_type: 0x80,
        ..Header::new()
    }
}

#[test]
fn safety_frame_uses_engine_checksums() {
    let codec = FrameCodec::with_engine(SummingEngine);
    let mut buf = [0u8; 64];
    let size = codec
        .pack(&header(Mode::Safety, 1), b"gyro", &mut buf)
        .unwrap();
    assert_eq!(size, HEADER_SIZE + 4 + 4);

    assert_eq!(buf[19], SummingEngine.crc8(&buf[..19]));
    let trailer = SummingEngine.crc32(&buf[..HEADER_SIZE + 4]).to_le_bytes();
    assert_eq!(&buf[HEADER_SIZE + 4..size], &trailer);

    let frame = codec.parse(&buf[..size]).unwrap();
    assert_eq!(frame.header().sequence, 1);
    assert_eq!(frame.payload(), b"gyro");
}

#[test]
fn engine_detects_payload_corruption() {
    let codec = FrameCodec::with_engine(SummingEngine);
    let mut buf = [0u8; 64];
    let size = codec
        .pack(&header(Mode::Safety, 2), b"accel", &mut buf)
        .unwrap();
    buf[HEADER_SIZE] ^= 0x10;

    assert!(matches!(
        codec.validate(&buf[..size]),
        Err(FrameError::InvalidCrc(CrcScope::Trailer))
    ));
}

#[test]
fn secure_frame_needs_the_same_key() {
    let key = b"device-key";
    let codec = FrameCodec::with_engine(SummingEngine).with_key(key);
    let mut buf = [0u8; 96];
    let size = codec
        .pack(&header(Mode::Secure, 3), b"mag", &mut buf)
        .unwrap();
    assert_eq!(size, HEADER_SIZE + 3 + HMAC_TAG_SIZE);
    assert_eq!(codec.validate(&buf[..size]).unwrap(), size);

    let other = FrameCodec::with_engine(SummingEngine).with_key(b"other-key");
    assert!(matches!(
        other.validate(&buf[..size]),
        Err(FrameError::InvalidHmac)
    ));

    let keyless = FrameCodec::with_engine(SummingEngine);
    assert!(matches!(
        keyless.validate(&buf[..size]),
        Err(FrameError::InvalidHmacKey)
    ));
}

#[test]
fn quaternion_tolerance_is_checked_without_sqrt() {
    let half = ImuQuat {
        w: 0.5,
        x: 0.5,
        y: 0.5,
        z: 0.5,
    };
    let mut bytes = [0u8; 16];
    assert_eq!(half.write(&mut bytes).unwrap(), 16);
    assert_eq!(ImuQuat::read(&bytes).unwrap(), half);

    let slightly_long = ImuQuat {
        w: 1.0005,
        ..ImuQuat::default()
    };
    assert!(slightly_long.is_normalized());

    let too_long = ImuQuat {
        w: 1.01,
        ..ImuQuat::default()
    };
    assert!(matches!(
        too_long.write(&mut bytes),
        Err(FrameError::ParseError(ParseErrorKind::NonUnitQuaternion))
    ));
    assert!(!ImuQuat {
        w: f32::NAN,
        ..ImuQuat::default()
    }
    .is_normalized());
}
