#![cfg(feature = "std")]

use std::io::Cursor;

use bytes::BytesMut;
use idtp_frame::{
    CrcScope, Frame, FrameCodec, FrameConfig, FrameDecoder, FrameError, FrameReader, Header,
    Imu3Acc, Imu3Gyr, Imu6, Mode, Resynchronizer, SyncStep, FRAME_MAX_SIZE,
};

const KEY: &[u8] = b"very_secure_key_32_bytes_length_";

fn imu6_frame(mode: Mode, sequence: u32) -> Frame {
    let header = Header {
        device_id: 0xABCD,
        sequence,
        mode: mode.into(),
        ..Header::new()
    };
    let imu = Imu6 {
        acc: Imu3Acc {
            acc_x: 0.0,
            acc_y: 0.0,
            acc_z: 9.81,
        },
        gyr: Imu3Gyr {
            gyr_x: 0.01,
            gyr_y: -0.02,
            gyr_z: 0.03,
        },
    };
    Frame::with_payload(header, &imu).unwrap()
}

fn pack(frame: &Frame) -> Vec<u8> {
    let mut buf = [0u8; FRAME_MAX_SIZE];
    let size = FrameCodec::new()
        .with_key(KEY)
        .pack_frame(frame, &mut buf)
        .unwrap();
    buf[..size].to_vec()
}

#[test]
fn corrupted_frame_then_valid_frame() {
    let mut corrupted = pack(&imu6_frame(Mode::Safety, 1));
    corrupted[12] ^= 0x04; // device_id, covered by CRC-8
    let valid = pack(&imu6_frame(Mode::Safety, 2));

    let mut stream = corrupted.clone();
    stream.extend_from_slice(&valid);

    let codec = FrameCodec::new();
    assert!(matches!(
        codec.parse(&stream),
        Err(FrameError::InvalidCrc(CrcScope::Header))
    ));

    let mut sync = Resynchronizer::new();
    sync.lose_sync();
    let step = sync.poll(&stream, &codec);
    assert_eq!(
        step,
        SyncStep::Aligned {
            discard: corrupted.len()
        }
    );

    let frame = codec.parse(&stream[step.discard()..]).unwrap();
    assert_eq!(frame.header().sequence, 2);
    assert_eq!(frame.payload_as::<Imu6>().unwrap().acc.acc_z, 9.81);
}

#[test]
fn every_split_point_yields_same_frames() {
    let mut stream = Vec::new();
    stream.extend(pack(&imu6_frame(Mode::Lite, 1)));
    stream.extend(pack(&imu6_frame(Mode::Safety, 2)));
    stream.extend(pack(&imu6_frame(Mode::Secure, 3)));

    let config = FrameConfig::default().with_hmac_key(KEY);
    for split in 0..=stream.len() {
        let mut decoder = FrameDecoder::with_config(&config);
        let mut buf = BytesMut::new();
        let mut sequences = Vec::new();

        for chunk in [&stream[..split], &stream[split..]] {
            buf.extend_from_slice(chunk);
            while let Some(frame) = decoder.decode(&mut buf).unwrap() {
                sequences.push(frame.header().sequence);
            }
        }
        assert_eq!(sequences, vec![1, 2, 3], "split at {split}");
        assert!(buf.is_empty());
    }
}

#[test]
fn noisy_capture_recovers_every_intact_frame() {
    let mut stream = vec![0xFF, 0x00, 0x49, 0x44]; // stray "ID"
    stream.extend(pack(&imu6_frame(Mode::Safety, 10)));

    let mut header_hit = pack(&imu6_frame(Mode::Safety, 11));
    header_hit[16] ^= 0x01; // version
    stream.extend(header_hit);

    let mut body_hit = pack(&imu6_frame(Mode::Safety, 12));
    body_hit[30] ^= 0x80;
    stream.extend(body_hit);

    stream.extend(pack(&imu6_frame(Mode::Secure, 13)));
    stream.extend([0x49, 0x44, 0x54]); // truncated preamble at the end

    let config = FrameConfig::default().with_hmac_key(KEY);
    let mut reader = FrameReader::with_config(Cursor::new(stream), config);

    let mut sequences = Vec::new();
    let mut trailer_failures = 0;
    loop {
        match reader.read_frame() {
            Ok(frame) => sequences.push(frame.header().sequence),
            Err(FrameError::InvalidCrc(CrcScope::Trailer)) => trailer_failures += 1,
            Err(FrameError::ConnectionClosed) => break,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(sequences, vec![10, 13]);
    assert_eq!(trailer_failures, 1);
    assert_eq!(reader.decoder().sync_stats().resyncs, 2);
}

#[test]
fn replayed_and_reordered_frames_are_distinct_from_corruption() {
    let mut stream = Vec::new();
    for sequence in [1, 2, 2, 1, 5, 4, 6] {
        stream.extend(pack(&imu6_frame(Mode::Safety, sequence)));
    }

    let config = FrameConfig::default().with_replay_protection(true);
    let mut decoder = FrameDecoder::with_config(&config);
    let mut buf = BytesMut::from(stream.as_slice());

    let mut accepted = Vec::new();
    let mut replayed = Vec::new();
    loop {
        match decoder.decode(&mut buf) {
            Ok(Some(frame)) => accepted.push(frame.header().sequence),
            Ok(None) => break,
            Err(FrameError::Replayed {
                sequence,
                watermark,
                ..
            }) => replayed.push((sequence, watermark)),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(accepted, vec![1, 2, 5, 6]);
    assert_eq!(replayed, vec![(2, 2), (1, 2), (4, 5)]);
    assert_eq!(
        decoder.sequence_guard().and_then(|g| g.watermark(0xABCD)),
        Some(6)
    );
}
