use std::cell::Cell;

use idtp_frame::{FrameError, IntegrityEngine, SoftwareEngine, HMAC_TAG_SIZE};

use crate::types::{IdtpIntegrityFns, IdtpResult};

/// [`IntegrityEngine`] over caller-supplied C callbacks.
///
/// CRC callbacks can fail on the C side while the engine interface cannot,
/// so the first failure is latched and checked by the caller after the
/// codec returns.
pub(crate) struct CallbackEngine {
    fns: IdtpIntegrityFns,
    failure: Cell<Option<IdtpResult>>,
}

impl CallbackEngine {
    pub(crate) fn new(fns: IdtpIntegrityFns) -> Self {
        Self {
            fns,
            failure: Cell::new(None),
        }
    }

    pub(crate) fn take_failure(&self) -> Option<IdtpResult> {
        self.failure.take()
    }

    fn record(&self, code: i32) {
        let result = IdtpResult::from_code(code);
        if result != IdtpResult::Ok && self.failure.get().is_none() {
            self.failure.set(Some(result));
        }
    }
}

impl IntegrityEngine for CallbackEngine {
    fn crc8(&self, data: &[u8]) -> u8 {
        let Some(crc8) = self.fns.crc8 else {
            return SoftwareEngine.crc8(data);
        };
        let mut out = 0u8;
        // SAFETY: `data` is valid for its length and `out` is one writable byte.
        let code = unsafe { crc8(data.as_ptr(), data.len(), &mut out) };
        self.record(code);
        out
    }

    fn crc32(&self, data: &[u8]) -> u32 {
        let Some(crc32) = self.fns.crc32 else {
            return SoftwareEngine.crc32(data);
        };
        let mut out = [0u8; 4];
        // SAFETY: `data` is valid for its length and `out` holds four writable bytes.
        let code = unsafe { crc32(data.as_ptr(), data.len(), out.as_mut_ptr()) };
        self.record(code);
        u32::from_le_bytes(out)
    }

    fn hmac_sha256(&self, data: &[u8], key: &[u8]) -> idtp_frame::Result<[u8; HMAC_TAG_SIZE]> {
        let Some(hmac) = self.fns.hmac_sha256 else {
            return SoftwareEngine.hmac_sha256(data, key);
        };
        let mut out = [0u8; HMAC_TAG_SIZE];
        // SAFETY: `data` and `key` are valid for their lengths and `out` holds the full tag.
        let code = unsafe {
            hmac(
                data.as_ptr(),
                data.len(),
                key.as_ptr(),
                key.len(),
                out.as_mut_ptr(),
            )
        };
        if IdtpResult::from_code(code) == IdtpResult::InvalidHmacKey {
            return Err(FrameError::InvalidHmacKey);
        }
        self.record(code);
        Ok(out)
    }
}
