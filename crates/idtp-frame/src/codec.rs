//! Single-frame pack, validate and parse over caller buffers.

use core::fmt;

use crate::error::{CrcScope, FrameError, ParseErrorKind, Result};
use crate::header::{Header, HEADER_CRC_SPAN, HEADER_SIZE};
use crate::integrity::IntegrityEngine;
#[cfg(feature = "software")]
use crate::integrity::SoftwareEngine;
use crate::mode::{Mode, TrailerAlgorithm};
use crate::payload::Payload;

/// Largest frame on the wire: header + payload + trailer.
pub const FRAME_MAX_SIZE: usize = 1024;

/// Smallest frame on the wire: a Lite header with an empty payload.
pub const FRAME_MIN_SIZE: usize = HEADER_SIZE;

/// Payload capacity.
pub const PAYLOAD_MAX_SIZE: usize = 972;

/// A header and its payload, stored inline.
///
/// The payload lives in a fixed-capacity array; `header.payload_size` is the
/// authoritative length.
#[derive(Clone, Copy)]
pub struct Frame {
    header: Header,
    payload: [u8; PAYLOAD_MAX_SIZE],
}

impl Frame {
    /// Create a frame, synchronizing `payload_size` with `payload`.
    pub fn new(header: Header, payload: &[u8]) -> Result<Self> {
        let mut frame = Self {
            header,
            payload: [0u8; PAYLOAD_MAX_SIZE],
        };
        frame.set_payload_raw(payload)?;
        Ok(frame)
    }

    /// Create a frame carrying a typed payload; also sets `payload_type`.
    pub fn with_payload<P: Payload>(header: Header, payload: &P) -> Result<Self> {
        let mut frame = Self {
            header,
            payload: [0u8; PAYLOAD_MAX_SIZE],
        };
        frame.set_payload(payload)?;
        Ok(frame)
    }

    /// Replace the payload bytes.
    pub fn set_payload_raw(&mut self, payload: &[u8]) -> Result<()> {
        let size = payload.len();
        let slot = self
            .payload
            .get_mut(..size)
            .ok_or(ParseErrorKind::PayloadTooLarge {
                size,
                max: PAYLOAD_MAX_SIZE,
            })?;
        slot.copy_from_slice(payload);
        self.header.payload_size = size as u16;
        Ok(())
    }

    /// Replace the payload with a typed value.
    pub fn set_payload<P: Payload>(&mut self, payload: &P) -> Result<()> {
        if P::SIZE > PAYLOAD_MAX_SIZE {
            return Err(ParseErrorKind::PayloadTooLarge {
                size: P::SIZE,
                max: PAYLOAD_MAX_SIZE,
            }
            .into());
        }
        let written = payload.write(&mut self.payload)?;
        self.header.payload_size = written as u16;
        self.header.payload_type = P::TYPE_ID;
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable header access. Changing `payload_size` here is not reflected
    /// in [`Frame::payload`] beyond the stored capacity.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn payload(&self) -> &[u8] {
        let size = (self.header.payload_size as usize).min(PAYLOAD_MAX_SIZE);
        &self.payload[..size]
    }

    /// Decode the payload as `P`, checking the header's payload type.
    pub fn payload_as<P: Payload>(&self) -> Result<P> {
        if self.header.payload_type != P::TYPE_ID {
            return Err(ParseErrorKind::PayloadTypeMismatch {
                expected: P::TYPE_ID,
                found: self.header.payload_type,
            }
            .into());
        }
        P::read(self.payload())
    }

    /// Wire size including the mode-mandated trailer.
    pub fn wire_size(&self) -> Result<usize> {
        self.header.frame_size()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.payload() == other.payload()
    }
}

impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.header)
            .field("payload", &format_args!("<{} bytes>", self.payload().len()))
            .finish()
    }
}

/// Packs and parses frames using an [`IntegrityEngine`].
///
/// The codec holds no mutable state; one instance can serve any number of
/// threads working on independent buffers.
#[cfg(feature = "software")]
#[derive(Clone, Copy)]
pub struct FrameCodec<'k, E = SoftwareEngine> {
    engine: E,
    key: Option<&'k [u8]>,
}

/// Packs and parses frames using an [`IntegrityEngine`].
///
/// Without the `software` feature the engine must be supplied through
/// [`FrameCodec::with_engine`].
#[cfg(not(feature = "software"))]
#[derive(Clone, Copy)]
pub struct FrameCodec<'k, E> {
    engine: E,
    key: Option<&'k [u8]>,
}

#[cfg(feature = "software")]
impl Default for FrameCodec<'_, SoftwareEngine> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "software")]
impl FrameCodec<'_, SoftwareEngine> {
    /// Codec backed by the software CRC/HMAC implementations.
    pub fn new() -> Self {
        Self {
            engine: SoftwareEngine,
            key: None,
        }
    }
}

impl<'k, E: IntegrityEngine> FrameCodec<'k, E> {
    /// Codec backed by a custom (e.g. hardware-accelerated) engine.
    pub fn with_engine(engine: E) -> Self {
        Self { engine, key: None }
    }

    /// Attach the pre-shared key used by Secure mode.
    pub fn with_key(mut self, key: &'k [u8]) -> Self {
        self.key = Some(key);
        self
    }

    /// Attach an optional key.
    pub fn with_optional_key(mut self, key: Option<&'k [u8]>) -> Self {
        self.key = key;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Pack `header` and `payload` into `dst`, returning the frame length.
    ///
    /// `payload_size` and `crc` are computed here; the caller's values are
    /// ignored.
    pub fn pack(&self, header: &Header, payload: &[u8], dst: &mut [u8]) -> Result<usize> {
        if payload.len() > PAYLOAD_MAX_SIZE {
            return Err(ParseErrorKind::PayloadTooLarge {
                size: payload.len(),
                max: PAYLOAD_MAX_SIZE,
            }
            .into());
        }
        let mode = header.operating_mode()?;
        if mode == Mode::Secure {
            self.secure_key()?;
        }

        let data_size = HEADER_SIZE + payload.len();
        let frame_size = data_size + mode.trailer_size();
        if dst.len() < frame_size {
            return Err(FrameError::underflow(frame_size, dst.len()));
        }

        let mut header = *header;
        header.payload_size = payload.len() as u16;
        header.crc = 0;
        let mut encoded = header.encode();
        encoded[HEADER_CRC_SPAN] = self.engine.crc8(&encoded[..HEADER_CRC_SPAN]);

        dst[..HEADER_SIZE].copy_from_slice(&encoded);
        dst[HEADER_SIZE..data_size].copy_from_slice(payload);

        let (data, rest) = dst.split_at_mut(data_size);
        let trailer = &mut rest[..mode.trailer_size()];
        match mode.algorithm() {
            TrailerAlgorithm::None => {}
            TrailerAlgorithm::Crc32 => {
                trailer.copy_from_slice(&self.engine.crc32(data).to_le_bytes());
            }
            TrailerAlgorithm::HmacSha256 => {
                let tag = self.engine.hmac_sha256(data, self.secure_key()?)?;
                trailer.copy_from_slice(&tag);
            }
        }

        tracing::trace!(
            device_id = header.device_id,
            sequence = header.sequence,
            %mode,
            frame_size,
            "packed frame"
        );
        Ok(frame_size)
    }

    /// Pack a previously assembled [`Frame`].
    pub fn pack_frame(&self, frame: &Frame, dst: &mut [u8]) -> Result<usize> {
        self.pack(frame.header(), frame.payload(), dst)
    }

    /// Check integrity of the frame at the start of `src` and return its size.
    ///
    /// Validation order: length, header CRC-8, header structure, full length,
    /// trailer. On a header CRC-8 mismatch the declared `payload_size` must
    /// not be trusted.
    pub fn validate(&self, src: &[u8]) -> Result<usize> {
        self.check(src).map(|(_, size)| size)
    }

    /// Validate and decode the frame at the start of `src`.
    pub fn parse(&self, src: &[u8]) -> Result<Frame> {
        let (header, _) = self.check(src)?;
        let payload = &src[HEADER_SIZE..HEADER_SIZE + header.payload_size as usize];
        let mut frame = Frame {
            header,
            payload: [0u8; PAYLOAD_MAX_SIZE],
        };
        frame.payload[..payload.len()].copy_from_slice(payload);
        Ok(frame)
    }

    /// Whether the first 20 bytes of `src` carry a matching header CRC-8.
    pub fn header_crc_matches(&self, src: &[u8]) -> bool {
        match src.get(..HEADER_SIZE) {
            Some(bytes) => self.engine.crc8(&bytes[..HEADER_CRC_SPAN]) == bytes[HEADER_CRC_SPAN],
            None => false,
        }
    }

    fn check(&self, src: &[u8]) -> Result<(Header, usize)> {
        if src.len() < HEADER_SIZE {
            return Err(FrameError::underflow(HEADER_SIZE, src.len()));
        }
        if !self.header_crc_matches(src) {
            return Err(FrameError::InvalidCrc(CrcScope::Header));
        }

        let header = Header::decode(src)?;
        let mode = header.check_structure()?;

        let data_size = HEADER_SIZE + header.payload_size as usize;
        let frame_size = data_size + mode.trailer_size();
        if src.len() < frame_size {
            return Err(FrameError::underflow(frame_size, src.len()));
        }

        let data = &src[..data_size];
        let trailer = &src[data_size..frame_size];
        match mode.algorithm() {
            TrailerAlgorithm::None => {}
            TrailerAlgorithm::Crc32 => {
                let mut received = [0u8; 4];
                received.copy_from_slice(trailer);
                if self.engine.crc32(data) != u32::from_le_bytes(received) {
                    tracing::debug!(
                        device_id = header.device_id,
                        sequence = header.sequence,
                        "trailer CRC-32 mismatch"
                    );
                    return Err(FrameError::InvalidCrc(CrcScope::Trailer));
                }
            }
            TrailerAlgorithm::HmacSha256 => {
                let key = self.secure_key()?;
                if !self.engine.verify_hmac_sha256(data, key, trailer)? {
                    tracing::error!(
                        device_id = header.device_id,
                        sequence = header.sequence,
                        "HMAC-SHA256 verification failed; possible tampering"
                    );
                    return Err(FrameError::InvalidHmac);
                }
            }
        }

        Ok((header, frame_size))
    }

    fn secure_key(&self) -> Result<&'k [u8]> {
        match self.key {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(FrameError::InvalidHmacKey),
        }
    }
}

impl<E> fmt::Debug for FrameCodec<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("FrameCodec");
        if let Some(key) = self.key {
            dbg.field("key", &format_args!("<redacted:{} bytes>", key.len()));
        } else {
            dbg.field("key", &Option::<&[u8]>::None);
        }
        dbg.finish_non_exhaustive()
    }
}
