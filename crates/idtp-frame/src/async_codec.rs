//! `tokio_util` codec adapter for async transports.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{Frame, FRAME_MAX_SIZE};
use crate::config::FrameConfig;
use crate::decoder::FrameDecoder;
use crate::error::{FrameError, Result};
use crate::integrity::{IntegrityEngine, SoftwareEngine};

/// Frame codec for `FramedRead`/`FramedWrite`.
///
/// A `Framed` stream ends on the first decoder error, so per-frame failures
/// are logged and skipped here. Only I/O errors and a missing Secure-mode
/// key terminate the stream.
#[derive(Debug)]
pub struct IdtpCodec<E = SoftwareEngine> {
    decoder: FrameDecoder<E>,
    dropped: u64,
}

impl Default for IdtpCodec<SoftwareEngine> {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

impl IdtpCodec<SoftwareEngine> {
    pub fn new(config: &FrameConfig) -> Self {
        Self::with_engine(SoftwareEngine, config)
    }
}

impl<E: IntegrityEngine> IdtpCodec<E> {
    pub fn with_engine(engine: E, config: &FrameConfig) -> Self {
        Self {
            decoder: FrameDecoder::with_engine(engine, config),
            dropped: 0,
        }
    }

    /// Frames skipped because they failed a per-frame check.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn decoder(&self) -> &FrameDecoder<E> {
        &self.decoder
    }
}

impl<E: IntegrityEngine> Decoder for IdtpCodec<E> {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            match self.decoder.decode(src) {
                Err(err) if err.is_recoverable() => {
                    self.dropped += 1;
                    tracing::warn!(error = %err, dropped = self.dropped, "skipping invalid frame");
                }
                other => return other,
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                tracing::debug!(remaining = src.len(), "stream ended mid-frame");
                src.clear();
                Err(FrameError::ConnectionClosed)
            }
        }
    }
}

impl<E: IntegrityEngine> Encoder<Frame> for IdtpCodec<E> {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Frame>>::encode(self, &frame, dst)
    }
}

impl<'a, E: IntegrityEngine> Encoder<&'a Frame> for IdtpCodec<E> {
    type Error = FrameError;

    fn encode(&mut self, frame: &'a Frame, dst: &mut BytesMut) -> Result<()> {
        let mut buf = [0u8; FRAME_MAX_SIZE];
        let size = self.decoder.codec().pack_frame(frame, &mut buf)?;
        dst.extend_from_slice(&buf[..size]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::FrameCodec;
    use crate::header::Header;
    use crate::mode::Mode;

    fn frame(sequence: u32, payload: &[u8]) -> Frame {
        let header = Header {
            device_id: 0x42,
            sequence,
            mode: Mode::Safety.into(),
            ..Header::new()
        };
        Frame::new(header, payload).unwrap()
    }

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let codec = FrameCodec::new();
        let mut out = Vec::new();
        for frame in frames {
            let mut buf = [0u8; FRAME_MAX_SIZE];
            let size = codec.pack_frame(frame, &mut buf).unwrap();
            out.extend_from_slice(&buf[..size]);
        }
        out
    }

    #[tokio::test]
    async fn framed_read_skips_corrupted_frames() {
        let mut bytes = b"noise".to_vec();
        bytes.extend(wire(&[frame(1, b"first")]));
        let mut bad = wire(&[frame(2, b"broken")]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        bytes.extend(bad);
        bytes.extend(wire(&[frame(3, b"third")]));

        let mut stream = FramedRead::new(bytes.as_slice(), IdtpCodec::default());
        let mut sequences = Vec::new();
        while let Some(frame) = stream.next().await {
            sequences.push(frame.unwrap().header().sequence);
        }
        assert_eq!(sequences, vec![1, 3]);
        assert_eq!(stream.decoder().dropped(), 1);
    }

    #[tokio::test]
    async fn framed_write_then_read_roundtrip() {
        let config = FrameConfig::default().with_hmac_key(b"async-key".to_vec());
        let mut sink = FramedWrite::new(Vec::new(), IdtpCodec::new(&config));
        for seq in 1..=3 {
            let mut f = frame(seq, b"data");
            f.header_mut().mode = Mode::Secure.into();
            sink.send(f).await.unwrap();
        }
        let bytes = sink.into_inner();

        let stream = FramedRead::new(bytes.as_slice(), IdtpCodec::new(&config));
        let frames: Vec<_> = stream.collect().await;
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.as_ref().unwrap().payload() == b"data"));
    }

    #[tokio::test]
    async fn truncated_tail_reports_connection_closed() {
        let bytes = wire(&[frame(1, b"whole"), frame(2, b"cut")]);
        let cut = &bytes[..bytes.len() - 2];

        let mut stream = FramedRead::new(cut, IdtpCodec::default());
        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn replayed_frames_are_skipped() {
        let config = FrameConfig::default().with_replay_protection(true);
        let mut codec = IdtpCodec::new(&config);
        let bytes = wire(&[frame(4, b"a"), frame(4, b"a"), frame(5, b"b")]);
        let mut buf = BytesMut::from(bytes.as_slice());

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().header().sequence, 4);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().header().sequence, 5);
        assert_eq!(codec.dropped(), 1);
    }

    #[test]
    fn missing_key_is_fatal() {
        let mut f = frame(1, b"s");
        f.header_mut().mode = Mode::Secure.into();
        let mut out = BytesMut::new();
        let mut codec = IdtpCodec::default();
        assert!(matches!(
            codec.encode(f, &mut out),
            Err(FrameError::InvalidHmacKey)
        ));
        assert!(out.is_empty());
    }
}
