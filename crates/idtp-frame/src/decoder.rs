//! Incremental stream decoding over `BytesMut`.

use bytes::{Buf, BytesMut};

use crate::codec::{Frame, FrameCodec};
use crate::config::FrameConfig;
use crate::error::{FrameError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::integrity::{IntegrityEngine, SoftwareEngine};
use crate::resync::{Resynchronizer, SyncStats, SyncStep};
use crate::sequence::SequenceGuard;

/// Incremental frame decoder over a growing byte buffer.
///
/// Performs no I/O. Feed bytes into a `BytesMut` and call [`decode`] until
/// it returns `Ok(None)`.
///
/// - A header CRC-8 failure silently drops sync; the decoder scans for the
///   next preamble before yielding again.
/// - A trailer or replay failure consumes the frame and returns the error.
///   The next call continues with the following frame.
/// - [`FrameError::InvalidHmacKey`] is returned without consuming anything.
///
/// [`decode`]: FrameDecoder::decode
pub struct FrameDecoder<E = SoftwareEngine> {
    engine: E,
    key: Option<Vec<u8>>,
    sync: Resynchronizer,
    guard: Option<SequenceGuard>,
}

impl Default for FrameDecoder<SoftwareEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder<SoftwareEngine> {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self::with_engine(SoftwareEngine, config)
    }
}

impl<E: IntegrityEngine> FrameDecoder<E> {
    pub fn with_engine(engine: E, config: &FrameConfig) -> Self {
        Self {
            engine,
            key: config.hmac_key.clone(),
            sync: Resynchronizer::new(),
            guard: config.replay_protection.then(SequenceGuard::new),
        }
    }

    /// Try to take one complete, verified frame off the front of `buf`.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        let codec = FrameCodec::with_engine(&self.engine).with_optional_key(self.key.as_deref());

        loop {
            if !self.sync.is_synced() {
                let step = self.sync.poll(buf, &codec);
                buf.advance(step.discard());
                if let SyncStep::NeedMore { .. } = step {
                    return Ok(None);
                }
            }

            if buf.len() < HEADER_SIZE {
                return Ok(None);
            }

            if !codec.header_crc_matches(buf) {
                tracing::warn!(buffered = buf.len(), "header CRC-8 mismatch, resynchronizing");
                self.sync.lose_sync();
                continue;
            }

            let header = Header::decode(buf)?;
            let frame_size = match header.check_structure() {
                Ok(mode) => HEADER_SIZE + header.payload_size as usize + mode.trailer_size(),
                Err(err) => {
                    tracing::warn!(error = %err, "malformed header, resynchronizing");
                    self.sync.lose_sync();
                    return Err(err);
                }
            };
            if buf.len() < frame_size {
                return Ok(None);
            }

            let frame = match codec.parse(&buf[..frame_size]) {
                Ok(frame) => frame,
                Err(FrameError::InvalidHmacKey) => return Err(FrameError::InvalidHmacKey),
                Err(err) => {
                    tracing::warn!(
                        device_id = header.device_id,
                        sequence = header.sequence,
                        error = %err,
                        "dropping frame"
                    );
                    buf.advance(frame_size);
                    return Err(err);
                }
            };
            buf.advance(frame_size);

            if let Some(guard) = self.guard.as_mut() {
                let (device_id, sequence) = (header.device_id, header.sequence);
                if !guard.accept(device_id, sequence) {
                    let watermark = guard.watermark(device_id).unwrap_or_default();
                    return Err(FrameError::Replayed {
                        device_id,
                        sequence,
                        watermark,
                    });
                }
            }

            tracing::debug!(
                device_id = header.device_id,
                sequence = header.sequence,
                frame_size,
                "decoded frame"
            );
            return Ok(Some(frame));
        }
    }

    /// A stateless codec sharing this decoder's engine and key.
    pub fn codec(&self) -> FrameCodec<'_, &E> {
        FrameCodec::with_engine(&self.engine).with_optional_key(self.key.as_deref())
    }

    pub fn is_synced(&self) -> bool {
        self.sync.is_synced()
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Replay guard, if replay protection is enabled.
    pub fn sequence_guard(&self) -> Option<&SequenceGuard> {
        self.guard.as_ref()
    }

    pub fn sequence_guard_mut(&mut self) -> Option<&mut SequenceGuard> {
        self.guard.as_mut()
    }
}

impl<E> std::fmt::Debug for FrameDecoder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("key", &self.key.as_ref().map(|key| format!("<redacted:{} bytes>", key.len())))
            .field("sync", &self.sync)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
