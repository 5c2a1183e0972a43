use std::ffi::c_void;

use idtp_frame::{Header, SequenceGuard};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdtpResult {
    Ok = 0,
    BufferUnderflow = 1,
    InvalidCrc = 2,
    InvalidHmac = 3,
    InvalidHmacKey = 4,
    ParseError = 5,
    Replayed = 6,
    InvalidArgument = 7,
    Internal = 99,
}

impl IdtpResult {
    /// Interpret a status code returned by caller code.
    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            0 => IdtpResult::Ok,
            1 => IdtpResult::BufferUnderflow,
            2 => IdtpResult::InvalidCrc,
            3 => IdtpResult::InvalidHmac,
            4 => IdtpResult::InvalidHmacKey,
            5 => IdtpResult::ParseError,
            6 => IdtpResult::Replayed,
            7 => IdtpResult::InvalidArgument,
            _ => IdtpResult::Internal,
        }
    }
}

pub const IDTP_RESULT_OK: IdtpResult = IdtpResult::Ok;
pub const IDTP_RESULT_BUFFER_UNDERFLOW: IdtpResult = IdtpResult::BufferUnderflow;
pub const IDTP_RESULT_INVALID_CRC: IdtpResult = IdtpResult::InvalidCrc;
pub const IDTP_RESULT_INVALID_HMAC: IdtpResult = IdtpResult::InvalidHmac;
pub const IDTP_RESULT_INVALID_HMAC_KEY: IdtpResult = IdtpResult::InvalidHmacKey;
pub const IDTP_RESULT_PARSE_ERROR: IdtpResult = IdtpResult::ParseError;
pub const IDTP_RESULT_REPLAYED: IdtpResult = IdtpResult::Replayed;
pub const IDTP_RESULT_INVALID_ARGUMENT: IdtpResult = IdtpResult::InvalidArgument;
pub const IDTP_RESULT_INTERNAL: IdtpResult = IdtpResult::Internal;

pub const IDTP_MODE_LITE: u8 = 0;
pub const IDTP_MODE_SAFETY: u8 = 1;
pub const IDTP_MODE_SECURE: u8 = 2;

pub const IDTP_HEADER_SIZE: usize = idtp_frame::HEADER_SIZE;
pub const IDTP_PAYLOAD_MAX_SIZE: usize = idtp_frame::PAYLOAD_MAX_SIZE;
pub const IDTP_FRAME_MAX_SIZE: usize = idtp_frame::FRAME_MAX_SIZE;

/// C view of the 20-byte header. Field order matches the wire layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdtpHeader {
    pub preamble: u32,
    pub timestamp: u32,
    pub sequence: u32,
    pub device_id: u16,
    pub payload_size: u16,
    pub version: u8,
    pub mode: u8,
    pub payload_type: u8,
    pub crc: u8,
}

impl From<Header> for IdtpHeader {
    fn from(header: Header) -> Self {
        Self {
            preamble: header.preamble,
            timestamp: header.timestamp,
            sequence: header.sequence,
            device_id: header.device_id,
            payload_size: header.payload_size,
            version: header.version,
            mode: header.mode,
            payload_type: header.payload_type,
            crc: header.crc,
        }
    }
}

impl From<IdtpHeader> for Header {
    fn from(header: IdtpHeader) -> Self {
        Self {
            preamble: header.preamble,
            timestamp: header.timestamp,
            sequence: header.sequence,
            device_id: header.device_id,
            payload_size: header.payload_size,
            version: header.version,
            mode: header.mode,
            payload_type: header.payload_type,
            crc: header.crc,
        }
    }
}

/// Writes one CRC-8 byte to `out`. Returns 0 on success.
pub type IdtpCrc8Fn = unsafe extern "C" fn(data: *const u8, size: usize, out: *mut u8) -> i32;

/// Writes the 4 trailer bytes (CRC-32, little-endian) to `out`. Returns 0 on success.
pub type IdtpCrc32Fn = unsafe extern "C" fn(data: *const u8, size: usize, out: *mut u8) -> i32;

/// Writes the 32-byte HMAC-SHA256 tag to `out`. Returns 0 on success.
pub type IdtpHmacFn = unsafe extern "C" fn(
    data: *const u8,
    size: usize,
    key: *const u8,
    key_size: usize,
    out: *mut u8,
) -> i32;

/// Caller-supplied integrity primitives, e.g. a hardware CRC unit.
///
/// A null entry falls back to the built-in software implementation.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IdtpIntegrityFns {
    pub crc8: Option<IdtpCrc8Fn>,
    pub crc32: Option<IdtpCrc32Fn>,
    pub hmac_sha256: Option<IdtpHmacFn>,
}

pub type IdtpSequenceGuardHandle = *mut c_void;

pub(crate) struct SequenceGuardHandle {
    pub(crate) guard: SequenceGuard,
}
