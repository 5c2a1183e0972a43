//! IDTP: framing for inertial measurement data.
//!
//! Each frame carries a 20-byte header protected by CRC-8, a payload of up to
//! 972 bytes and a trailer selected by the operating mode (none, CRC-32 or
//! HMAC-SHA256). Standard payloads hold little-endian IMU samples.
//!
//! # Crate Structure
//!
//! - [`frame`]: header/frame codec, integrity engines, payload layouts, stream
//!   resynchronization, replay protection and blocking/async stream adapters.
//!
//! The `idtp` binary (feature `cli`) packs single frames and inspects captured
//! byte streams.

/// Re-export frame types.
pub mod frame {
    pub use idtp_frame::*;
}
