//! Blocking frame input with resynchronization.

use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{Frame, FRAME_MAX_SIZE};
use crate::config::{FrameConfig, StreamTimeouts};
use crate::decoder::FrameDecoder;
use crate::error::{FrameError, Result};
use crate::integrity::{IntegrityEngine, SoftwareEngine};

const INITIAL_BUFFER_CAPACITY: usize = 4 * FRAME_MAX_SIZE;
const READ_CHUNK_SIZE: usize = FRAME_MAX_SIZE;

/// Reads verified frames from any `Read` stream.
///
/// Partial reads and resynchronization are handled internally. Per-frame
/// failures (see [`FrameError::is_recoverable`]) are returned once and the
/// next call continues with the following frame.
pub struct FrameReader<T, E = SoftwareEngine> {
    inner: T,
    buf: BytesMut,
    decoder: FrameDecoder<E>,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T, SoftwareEngine> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self::with_engine(inner, SoftwareEngine, config)
    }
}

impl<T: Read + StreamTimeouts> FrameReader<T, SoftwareEngine> {
    /// Create a frame reader and apply the configured read timeout to the socket.
    pub fn with_config_stream(inner: T, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

impl<T: Read, E: IntegrityEngine> FrameReader<T, E> {
    /// Create a frame reader backed by a custom integrity engine.
    pub fn with_engine(inner: T, engine: E, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: FrameDecoder::with_engine(engine, &config),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.decoder.decode(&mut self.buf)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame, skipping frames that fail per-frame checks.
    pub fn read_valid_frame(&mut self) -> Result<Frame> {
        loop {
            match self.read_frame() {
                Err(err) if err.is_recoverable() => continue,
                other => return other,
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn decoder(&self) -> &FrameDecoder<E> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut FrameDecoder<E> {
        &mut self.decoder
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
