//! Stream settings and socket timeout plumbing.

use std::fmt;
use std::io;
use std::time::Duration;

/// Settings shared by the stream decoder, reader and writer.
#[derive(Clone, Default)]
pub struct FrameConfig {
    /// Pre-shared key for Secure mode frames.
    pub hmac_key: Option<Vec<u8>>,
    /// Reject frames whose sequence number does not advance per device.
    pub replay_protection: bool,
    /// Read timeout applied by [`FrameReader::with_config_stream`](crate::FrameReader::with_config_stream).
    pub read_timeout: Option<Duration>,
    /// Write timeout applied by [`FrameWriter::with_config_stream`](crate::FrameWriter::with_config_stream).
    pub write_timeout: Option<Duration>,
}

impl FrameConfig {
    pub fn with_hmac_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.hmac_key = Some(key.into());
        self
    }

    pub fn with_replay_protection(mut self, enabled: bool) -> Self {
        self.replay_protection = enabled;
        self
    }
}

impl fmt::Debug for FrameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self
            .hmac_key
            .as_ref()
            .map(|key| format!("<redacted:{} bytes>", key.len()));
        f.debug_struct("FrameConfig")
            .field("hmac_key", &key)
            .field("replay_protection", &self.replay_protection)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

/// Transports whose blocking calls accept OS-level timeouts.
pub trait StreamTimeouts {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl StreamTimeouts for std::net::TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::net::TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::net::TcpStream::set_write_timeout(self, timeout)
    }
}

#[cfg(unix)]
impl StreamTimeouts for std::os::unix::net::UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout)
    }
}
