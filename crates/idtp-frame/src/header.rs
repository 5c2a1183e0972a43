//! Fixed 20-byte frame header.
//!
//! Wire layout (all integers little-endian):
//!
//! ```text
//! offset  size  field
//!  0      4     preamble      "IDTP"
//!  4      4     timestamp
//!  8      4     sequence
//! 12      2     device_id
//! 14      2     payload_size
//! 16      1     version
//! 17      1     mode
//! 18      1     payload_type
//! 19      1     crc           CRC-8 over bytes 0..19
//! ```

use bytes::{Buf, BufMut};

use crate::error::{FrameError, ParseErrorKind, Result};
use crate::mode::Mode;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 20;

/// Number of leading header bytes covered by the header CRC-8.
pub const HEADER_CRC_SPAN: usize = HEADER_SIZE - 1;

/// Magic value opening every frame. Its little-endian bytes spell "IDTP".
pub const PREAMBLE: u32 = 0x5054_4449;

/// Preamble as it appears on the wire.
pub const PREAMBLE_BYTES: [u8; 4] = PREAMBLE.to_le_bytes();

/// Protocol version spoken by this implementation (major 2, minor 1).
pub const VERSION: u8 = 0x21;

/// Frame header.
///
/// Fields carry raw wire values. Decoding never validates them; semantic
/// checks belong to [`FrameCodec`](crate::FrameCodec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Start-of-frame marker.
    pub preamble: u32,
    /// Sensor-local clock, microseconds recommended.
    pub timestamp: u32,
    /// Per-device monotonically increasing counter.
    pub sequence: u32,
    /// Vendor-assigned device identity.
    pub device_id: u16,
    /// Length of the payload that follows the header.
    pub payload_size: u16,
    /// Protocol version tag.
    pub version: u8,
    /// Operating mode selector (see [`Mode`]).
    pub mode: u8,
    /// Standard (0x00-0x7F) or vendor (0x80-0xFF) payload type.
    pub payload_type: u8,
    /// CRC-8 over the 19 preceding header bytes.
    pub crc: u8,
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    /// Create a header with the preamble and version preset and Safety mode.
    pub fn new() -> Self {
        Self {
            preamble: PREAMBLE,
            timestamp: 0,
            sequence: 0,
            device_id: 0,
            payload_size: 0,
            version: VERSION,
            mode: Mode::Safety.into(),
            payload_type: 0,
            crc: 0,
        }
    }

    /// Typed operating mode.
    pub fn operating_mode(&self) -> Result<Mode> {
        Mode::try_from(self.mode)
    }

    /// Trailer length mandated by the header's mode.
    pub fn trailer_size(&self) -> Result<usize> {
        Ok(self.operating_mode()?.trailer_size())
    }

    /// Total wire size of the frame this header describes.
    pub fn frame_size(&self) -> Result<usize> {
        Ok(HEADER_SIZE + self.payload_size as usize + self.trailer_size()?)
    }

    /// Serialize every field at its fixed offset.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let mut dst = &mut out[..];
        dst.put_u32_le(self.preamble);
        dst.put_u32_le(self.timestamp);
        dst.put_u32_le(self.sequence);
        dst.put_u16_le(self.device_id);
        dst.put_u16_le(self.payload_size);
        dst.put_u8(self.version);
        dst.put_u8(self.mode);
        dst.put_u8(self.payload_type);
        dst.put_u8(self.crc);
        out
    }

    /// Deserialize a header from the first [`HEADER_SIZE`] bytes of `src`.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let mut src = src
            .get(..HEADER_SIZE)
            .ok_or_else(|| FrameError::underflow(HEADER_SIZE, src.len()))?;
        Ok(Self {
            preamble: src.get_u32_le(),
            timestamp: src.get_u32_le(),
            sequence: src.get_u32_le(),
            device_id: src.get_u16_le(),
            payload_size: src.get_u16_le(),
            version: src.get_u8(),
            mode: src.get_u8(),
            payload_type: src.get_u8(),
            crc: src.get_u8(),
        })
    }

    /// Semantic checks a receiver applies once the CRC-8 matched.
    pub(crate) fn check_structure(&self) -> Result<Mode> {
        if self.preamble != PREAMBLE {
            return Err(ParseErrorKind::InvalidPreamble(self.preamble).into());
        }
        if self.version != VERSION {
            return Err(ParseErrorKind::UnsupportedVersion(self.version).into());
        }
        let size = self.payload_size as usize;
        if size > crate::PAYLOAD_MAX_SIZE {
            return Err(ParseErrorKind::PayloadTooLarge {
                size,
                max: crate::PAYLOAD_MAX_SIZE,
            }
            .into());
        }
        self.operating_mode()
    }
}
