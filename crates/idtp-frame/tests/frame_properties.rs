#![cfg(feature = "std")]

use bytes::BytesMut;
use idtp_frame::{
    CrcScope, FrameCodec, FrameDecoder, FrameError, Header, Mode, SequenceGuard, FRAME_MAX_SIZE,
    HEADER_SIZE, PAYLOAD_MAX_SIZE,
};
use proptest::prelude::*;

const KEY: &[u8] = b"property-test-pre-shared-key";

fn any_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Lite), Just(Mode::Safety), Just(Mode::Secure)]
}

fn any_header() -> impl Strategy<Value = Header> {
    (
        any::<u32>(),
        any::<u32>(),
        any::<u16>(),
        any::<u8>(),
        any_mode(),
    )
        .prop_map(|(timestamp, sequence, device_id, payload_type, mode)| Header {
            timestamp,
            sequence,
            device_id,
            payload_type,
            mode: mode.into(),
            ..Header::new()
        })
}

fn any_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=PAYLOAD_MAX_SIZE)
}

proptest! {
    #[test]
    fn pack_then_parse_preserves_header_and_payload(header in any_header(), payload in any_payload()) {
        let codec = FrameCodec::new().with_key(KEY);
        let mut buf = [0u8; FRAME_MAX_SIZE];
        let size = codec.pack(&header, &payload, &mut buf).unwrap();

        let frame = codec.parse(&buf[..size]).unwrap();
        let parsed = frame.header();
        prop_assert_eq!(parsed.timestamp, header.timestamp);
        prop_assert_eq!(parsed.sequence, header.sequence);
        prop_assert_eq!(parsed.device_id, header.device_id);
        prop_assert_eq!(parsed.payload_type, header.payload_type);
        prop_assert_eq!(parsed.mode, header.mode);
        prop_assert_eq!(parsed.payload_size as usize, payload.len());
        prop_assert_eq!(frame.payload(), payload.as_slice());
    }

    #[test]
    fn packed_size_follows_mode(header in any_header(), payload in any_payload()) {
        let codec = FrameCodec::new().with_key(KEY);
        let mut buf = [0u8; FRAME_MAX_SIZE];
        let size = codec.pack(&header, &payload, &mut buf).unwrap();

        let mode = Mode::try_from(header.mode).unwrap();
        prop_assert_eq!(size, HEADER_SIZE + payload.len() + mode.trailer_size());
        prop_assert!(size <= FRAME_MAX_SIZE);
        prop_assert_eq!(codec.validate(&buf[..size]).unwrap(), size);
    }

    #[test]
    fn any_single_bit_flip_in_header_is_detected(
        header in any_header(),
        payload in prop::collection::vec(any::<u8>(), 0..64),
        byte in 0..HEADER_SIZE,
        bit in 0u8..8,
    ) {
        let codec = FrameCodec::new().with_key(KEY);
        let mut buf = [0u8; FRAME_MAX_SIZE];
        let size = codec.pack(&header, &payload, &mut buf).unwrap();

        buf[byte] ^= 1 << bit;
        prop_assert!(!codec.header_crc_matches(&buf[..size]));
        prop_assert!(matches!(
            codec.parse(&buf[..size]),
            Err(FrameError::InvalidCrc(CrcScope::Header))
        ));
    }

    #[test]
    fn any_single_bit_flip_in_safety_body_is_detected(
        payload in prop::collection::vec(any::<u8>(), 1..128),
        offset in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let header = Header { mode: Mode::Safety.into(), ..Header::new() };
        let codec = FrameCodec::new();
        let mut buf = [0u8; FRAME_MAX_SIZE];
        let size = codec.pack(&header, &payload, &mut buf).unwrap();

        let target = HEADER_SIZE + offset.index(size - HEADER_SIZE);
        buf[target] ^= 1 << bit;
        prop_assert!(matches!(
            codec.parse(&buf[..size]),
            Err(FrameError::InvalidCrc(CrcScope::Trailer))
        ));
    }

    #[test]
    fn watermark_never_decreases(events in prop::collection::vec((0u16..4, any::<u32>()), 1..200)) {
        let mut guard = SequenceGuard::new();
        for (device, sequence) in events {
            let before = guard.watermark(device);
            let accepted = guard.accept(device, sequence);
            let after = guard.watermark(device);

            match before {
                None => prop_assert!(accepted),
                Some(mark) => prop_assert_eq!(accepted, sequence > mark),
            }
            prop_assert!(after >= before);
            if accepted {
                prop_assert_eq!(after, Some(sequence));
            }
        }
    }

    #[test]
    fn decoder_recovers_after_garbage(
        garbage in prop::collection::vec(any::<u8>().prop_filter("no preamble start", |b| *b != b'I'), 0..256),
        header in any_header(),
        payload in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let codec = FrameCodec::new().with_key(KEY);
        let mut frame_bytes = [0u8; FRAME_MAX_SIZE];
        let size = codec.pack(&header, &payload, &mut frame_bytes).unwrap();

        let mut buf = BytesMut::from(garbage.as_slice());
        buf.extend_from_slice(&frame_bytes[..size]);

        let config = idtp_frame::FrameConfig::default().with_hmac_key(KEY);
        let mut decoder = FrameDecoder::with_config(&config);
        let frame = loop {
            match decoder.decode(&mut buf) {
                Ok(Some(frame)) => break frame,
                Ok(None) => prop_assert!(false, "decoder stalled before the valid frame"),
                // Garbage at offset 0 may pass CRC-8 by chance and fail structurally.
                Err(err) => prop_assert!(err.is_recoverable(), "unexpected error: {err}"),
            }
        };
        prop_assert_eq!(frame.header().sequence, header.sequence);
        prop_assert_eq!(frame.payload(), payload.as_slice());
        prop_assert!(buf.is_empty());
    }
}
