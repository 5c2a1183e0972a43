//! Integrity primitives behind a pluggable interface.
//!
//! [`FrameCodec`](crate::FrameCodec) only depends on [`IntegrityEngine`], so a
//! hardware CRC unit or crypto accelerator can replace `SoftwareEngine`
//! without touching codec logic. `SoftwareEngine` is only built with the
//! `software` feature.

#[cfg(feature = "software")]
use crc::{Crc, CRC_32_AUTOSAR, CRC_8_AUTOSAR};
#[cfg(feature = "software")]
use hmac::{Hmac, Mac};
#[cfg(feature = "software")]
use sha2::Sha256;

#[cfg(feature = "software")]
use crate::error::FrameError;
use crate::error::Result;

/// HMAC-SHA256 tag length.
pub const HMAC_TAG_SIZE: usize = 32;

#[cfg(feature = "software")]
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_AUTOSAR);
#[cfg(feature = "software")]
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_AUTOSAR);

#[cfg(feature = "software")]
type HmacSha256 = Hmac<Sha256>;

/// CRC and MAC provider used by the codec.
///
/// Implementations must be deterministic and free of side effects visible to
/// the codec.
pub trait IntegrityEngine {
    /// CRC-8 over the first 19 header bytes.
    fn crc8(&self, data: &[u8]) -> u8;

    /// CRC-32 over header and payload.
    fn crc32(&self, data: &[u8]) -> u32;

    /// HMAC-SHA256 over header and payload. `key` is never empty.
    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; HMAC_TAG_SIZE]>;

    /// Check a received tag. The default compares in constant time.
    fn verify_hmac_sha256(&self, data: &[u8], key: &[u8], tag: &[u8]) -> Result<bool> {
        let expected = self.hmac_sha256(data, key)?;
        if tag.len() != expected.len() {
            return Ok(false);
        }
        let diff = expected
            .iter()
            .zip(tag)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        Ok(diff == 0)
    }
}

impl<E: IntegrityEngine + ?Sized> IntegrityEngine for &E {
    fn crc8(&self, data: &[u8]) -> u8 {
        (**self).crc8(data)
    }

    fn crc32(&self, data: &[u8]) -> u32 {
        (**self).crc32(data)
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; HMAC_TAG_SIZE]> {
        (**self).hmac_sha256(data, key)
    }

    fn verify_hmac_sha256(&self, data: &[u8], key: &[u8], tag: &[u8]) -> Result<bool> {
        (**self).verify_hmac_sha256(data, key, tag)
    }
}

/// Table-driven CRC-8/AUTOSAR, CRC-32/AUTOSAR and RustCrypto HMAC-SHA256.
#[cfg(feature = "software")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareEngine;

#[cfg(feature = "software")]
impl IntegrityEngine for SoftwareEngine {
    fn crc8(&self, data: &[u8]) -> u8 {
        CRC8.checksum(data)
    }

    fn crc32(&self, data: &[u8]) -> u32 {
        CRC32.checksum(data)
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> Result<[u8; HMAC_TAG_SIZE]> {
        let mut mac = HmacSha256::new_from_slice(key).map_err(|_| FrameError::InvalidHmacKey)?;
        mac.update(data);
        let mut tag = [0u8; HMAC_TAG_SIZE];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }

    fn verify_hmac_sha256(&self, data: &[u8], key: &[u8], tag: &[u8]) -> Result<bool> {
        let mut mac = HmacSha256::new_from_slice(key).map_err(|_| FrameError::InvalidHmacKey)?;
        mac.update(data);
        Ok(mac.verify_slice(tag).is_ok())
    }
}
