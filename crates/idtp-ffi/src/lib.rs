//! idtp-ffi: C-ABI exports for the IDTP frame codec.
//!
//! Every entry point returns an [`IdtpResult`] status; the message for the
//! last failure on the calling thread is available from [`idtp_last_error`].

mod args;
mod codec;
mod engine;
mod error;
mod sequence;
mod types;

use std::panic::AssertUnwindSafe;

pub use codec::{
    idtp_header_init, idtp_pack, idtp_pack_with, idtp_parse, idtp_parse_with, idtp_validate,
    idtp_validate_with,
};
pub use sequence::{
    idtp_sequence_guard_accept, idtp_sequence_guard_free, idtp_sequence_guard_new,
    idtp_sequence_guard_reset,
};
pub use types::{
    IdtpCrc32Fn, IdtpCrc8Fn, IdtpHeader, IdtpHmacFn, IdtpIntegrityFns, IdtpResult,
    IdtpSequenceGuardHandle, IDTP_FRAME_MAX_SIZE, IDTP_HEADER_SIZE, IDTP_MODE_LITE,
    IDTP_MODE_SAFETY, IDTP_MODE_SECURE, IDTP_PAYLOAD_MAX_SIZE, IDTP_RESULT_BUFFER_UNDERFLOW,
    IDTP_RESULT_INTERNAL, IDTP_RESULT_INVALID_ARGUMENT, IDTP_RESULT_INVALID_CRC,
    IDTP_RESULT_INVALID_HMAC, IDTP_RESULT_INVALID_HMAC_KEY, IDTP_RESULT_OK,
    IDTP_RESULT_PARSE_ERROR, IDTP_RESULT_REPLAYED,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn idtp_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
