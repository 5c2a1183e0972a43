use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use idtp_frame::FrameError;

use crate::types::IdtpResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> IdtpResult {
    set_error_message(message);
    IdtpResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_frame_error(err: &FrameError) -> IdtpResult {
    set_error_message(err.to_string());
    match err {
        FrameError::BufferUnderflow { .. } => IdtpResult::BufferUnderflow,
        FrameError::InvalidCrc(_) => IdtpResult::InvalidCrc,
        FrameError::InvalidHmac => IdtpResult::InvalidHmac,
        FrameError::InvalidHmacKey => IdtpResult::InvalidHmacKey,
        FrameError::ParseError(_) => IdtpResult::ParseError,
        FrameError::Replayed { .. } => IdtpResult::Replayed,
        FrameError::Io(_) | FrameError::ConnectionClosed => IdtpResult::Internal,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
