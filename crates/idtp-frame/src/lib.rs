//! Frame codec for the IMU data transfer protocol (IDTP).
//!
//! Every frame on the wire is:
//! - A 20-byte little-endian header starting with the "IDTP" preamble and
//!   ending with a CRC-8 over the preceding 19 bytes
//! - Up to 972 bytes of payload
//! - A trailer chosen by the header mode: none (Lite), CRC-32 (Safety) or
//!   HMAC-SHA256 (Secure)
//!
//! [`FrameCodec`] packs and parses single frames in caller-provided buffers
//! without allocating. With the `std` feature, `FrameDecoder`, `FrameReader`
//! and `FrameWriter` work on byte streams and recover from corruption by
//! scanning for the next valid header.
//!
//! # Features
//!
//! - `std` (default): the stream adapters, `FrameConfig`, `SequenceGuard`
//!   and the I/O error variants. Implies `software`.
//! - `software` (default): `SoftwareEngine`, backed by the `crc`, `hmac` and
//!   `sha2` crates.
//! - `async`: `IdtpCodec` for `tokio_util::codec`. Implies `std`.
//!
//! With `--no-default-features` the crate is `no_std` and keeps the header,
//! payload, mode and [`FrameCodec`] APIs. Integrity then comes from a caller
//! supplied [`IntegrityEngine`]. `bytes` and `tracing` still need `alloc` on
//! such targets.
//!
//! ```text
//! cargo build -p idtp-frame --no-default-features
//! cargo build -p idtp-frame --no-default-features --features software
//! ```

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod codec;
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod decoder;
pub mod error;
pub mod header;
pub mod integrity;
pub mod mode;
pub mod payload;
#[cfg(feature = "std")]
pub mod reader;
pub mod resync;
#[cfg(feature = "std")]
pub mod sequence;
#[cfg(feature = "std")]
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::IdtpCodec;
pub use codec::{Frame, FrameCodec, FRAME_MAX_SIZE, FRAME_MIN_SIZE, PAYLOAD_MAX_SIZE};
#[cfg(feature = "std")]
pub use config::{FrameConfig, StreamTimeouts};
#[cfg(feature = "std")]
pub use decoder::FrameDecoder;
pub use error::{CrcScope, FrameError, ParseErrorKind, Result};
pub use header::{Header, HEADER_SIZE, PREAMBLE, VERSION};
#[cfg(feature = "software")]
pub use integrity::SoftwareEngine;
pub use integrity::{IntegrityEngine, HMAC_TAG_SIZE};
pub use mode::{Mode, TrailerAlgorithm};
pub use payload::{
    Imu10, Imu3Acc, Imu3Gyr, Imu3Mag, Imu6, Imu9, ImuQuat, Payload, PayloadType, StandardPayload,
};
#[cfg(feature = "std")]
pub use reader::FrameReader;
pub use resync::{Resynchronizer, SyncState, SyncStats, SyncStep};
#[cfg(feature = "std")]
pub use sequence::SequenceGuard;
#[cfg(feature = "std")]
pub use writer::FrameWriter;
