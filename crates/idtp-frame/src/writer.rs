//! Blocking frame output.

use std::io::{ErrorKind, Write};

use crate::codec::{Frame, FrameCodec, FRAME_MAX_SIZE};
use crate::config::{FrameConfig, StreamTimeouts};
use crate::error::{FrameError, Result};
use crate::header::Header;
use crate::integrity::{IntegrityEngine, SoftwareEngine};
use crate::payload::Payload;

/// Writes complete frames to any `Write` stream.
///
/// Each frame is packed into a stack buffer and written in full before the
/// call returns.
pub struct FrameWriter<T, E = SoftwareEngine> {
    inner: T,
    engine: E,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T, SoftwareEngine> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self::with_engine(inner, SoftwareEngine, config)
    }
}

impl<T: Write + StreamTimeouts> FrameWriter<T, SoftwareEngine> {
    /// Create a frame writer and apply the configured write timeout to the socket.
    pub fn with_config_stream(inner: T, config: FrameConfig) -> Result<Self> {
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

impl<T: Write, E: IntegrityEngine> FrameWriter<T, E> {
    pub fn with_engine(inner: T, engine: E, config: FrameConfig) -> Self {
        Self {
            inner,
            engine,
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.header(), frame.payload())
    }

    /// Pack and send a header with raw payload bytes.
    pub fn send(&mut self, header: &Header, payload: &[u8]) -> Result<()> {
        let mut buf = [0u8; FRAME_MAX_SIZE];
        let size = FrameCodec::with_engine(&self.engine)
            .with_optional_key(self.config.hmac_key.as_deref())
            .pack(header, payload, &mut buf)?;
        self.write_all(&buf[..size])?;
        self.flush()
    }

    /// Pack and send a typed payload; `payload_type` is taken from `P`.
    pub fn send_payload<P: Payload>(&mut self, header: &Header, payload: &P) -> Result<()> {
        let frame = Frame::with_payload(*header, payload)?;
        self.write_frame(&frame)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
