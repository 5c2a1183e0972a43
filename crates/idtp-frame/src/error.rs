use core::fmt;

/// Which CRC check rejected the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcScope {
    /// CRC-8 over the first 19 header bytes.
    Header,
    /// CRC-32 trailer over header and payload (Safety mode).
    Trailer,
}

impl fmt::Display for CrcScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrcScope::Header => f.write_str("header CRC-8"),
            CrcScope::Trailer => f.write_str("trailer CRC-32"),
        }
    }
}

/// Structural problems detected before a frame could be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// Payload longer than the protocol allows.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Mode byte outside {Lite, Safety, Secure}.
    #[error("unknown operating mode 0x{0:02x}")]
    UnknownMode(u8),

    /// Preamble does not spell "IDTP".
    #[error("invalid preamble 0x{0:08x}")]
    InvalidPreamble(u32),

    /// Protocol version tag this implementation does not speak.
    #[error("unsupported protocol version 0x{0:02x}")]
    UnsupportedVersion(u8),

    /// Header payload type does not match the requested payload.
    #[error("payload type mismatch (expected 0x{expected:02x}, found 0x{found:02x})")]
    PayloadTypeMismatch { expected: u8, found: u8 },

    /// Payload length does not match the fixed layout of its type.
    #[error("payload length mismatch (expected {expected} bytes, found {found})")]
    PayloadLengthMismatch { expected: usize, found: usize },

    /// Attitude quaternion is not unit length.
    #[error("quaternion is not normalized")]
    NonUnitQuaternion,
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Not enough bytes to decode, or not enough room to encode.
    #[error("buffer underflow ({needed} bytes needed, {available} available)")]
    BufferUnderflow { needed: usize, available: usize },

    /// A CRC check failed.
    #[error("invalid {0}")]
    InvalidCrc(CrcScope),

    /// The HMAC-SHA256 trailer did not verify. Possible tampering.
    #[error("invalid HMAC-SHA256 trailer")]
    InvalidHmac,

    /// Secure mode was requested without a usable pre-shared key.
    #[error("missing or empty HMAC key for secure mode")]
    InvalidHmacKey,

    /// Structurally invalid input.
    #[error("parse error: {0}")]
    ParseError(#[from] ParseErrorKind),

    /// The frame is intact but its sequence number is not above the device watermark.
    #[error("replayed frame from device 0x{device_id:04x} (sequence {sequence}, watermark {watermark})")]
    Replayed {
        device_id: u16,
        sequence: u32,
        watermark: u32,
    },

    /// An I/O error occurred while reading or writing frames.
    #[cfg(feature = "std")]
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[cfg(feature = "std")]
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    pub(crate) fn underflow(needed: usize, available: usize) -> Self {
        FrameError::BufferUnderflow { needed, available }
    }

    /// Whether a stream consumer can drop the offending frame and keep reading.
    ///
    /// Missing keys and I/O failures are not per-frame conditions.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidCrc(_)
                | FrameError::InvalidHmac
                | FrameError::ParseError(_)
                | FrameError::Replayed { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, FrameError>;
