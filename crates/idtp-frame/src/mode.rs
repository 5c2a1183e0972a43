//! Operating modes and the trailer policy each one mandates.

use core::fmt;

use crate::error::{FrameError, ParseErrorKind};

/// CRC-32 trailer length.
pub const CRC32_TRAILER_SIZE: usize = 4;

/// HMAC-SHA256 trailer length.
pub const HMAC_TRAILER_SIZE: usize = 32;

/// Operating mode carried in the header `mode` byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Mode {
    /// Header CRC-8 only. For trusted channels.
    Lite = 0x00,
    /// CRC-32 trailer over header and payload.
    #[default]
    Safety = 0x01,
    /// HMAC-SHA256 trailer keyed with a pre-shared secret.
    Secure = 0x02,
}

/// Integrity algorithm protecting header and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerAlgorithm {
    None,
    Crc32,
    HmacSha256,
}

impl Mode {
    /// Trailer length in bytes.
    pub const fn trailer_size(self) -> usize {
        match self {
            Mode::Lite => 0,
            Mode::Safety => CRC32_TRAILER_SIZE,
            Mode::Secure => HMAC_TRAILER_SIZE,
        }
    }

    /// Algorithm that fills the trailer.
    pub const fn algorithm(self) -> TrailerAlgorithm {
        match self {
            Mode::Lite => TrailerAlgorithm::None,
            Mode::Safety => TrailerAlgorithm::Crc32,
            Mode::Secure => TrailerAlgorithm::HmacSha256,
        }
    }

    /// Short lowercase name, as used on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Mode::Lite => "lite",
            Mode::Safety => "safety",
            Mode::Secure => "secure",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        mode as u8
    }
}

/// Unknown mode bytes are rejected outright. Mapping them to Lite would let
/// a corrupted mode byte silently strip the trailer check.
impl TryFrom<u8> for Mode {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x00 => Ok(Mode::Lite),
            0x01 => Ok(Mode::Safety),
            0x02 => Ok(Mode::Secure),
            other => Err(ParseErrorKind::UnknownMode(other).into()),
        }
    }
}
