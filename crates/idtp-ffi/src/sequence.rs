use idtp_frame::SequenceGuard;

use crate::error;
use crate::types::{IdtpResult, IdtpSequenceGuardHandle, SequenceGuardHandle};

fn with_guard<T>(
    handle: IdtpSequenceGuardHandle,
    on_error: T,
    f: impl FnOnce(&mut SequenceGuard) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("sequence guard handle cannot be null");
        return on_error;
    }

    let guard_handle = {
        // SAFETY: Non-null validated above; caller guarantees it came from idtp_sequence_guard_new.
        unsafe { &mut *(handle as *mut SequenceGuardHandle) }
    };
    f(&mut guard_handle.guard)
}

/// Allocate an empty per-device replay guard.
#[no_mangle]
pub extern "C" fn idtp_sequence_guard_new() -> IdtpSequenceGuardHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let handle = SequenceGuardHandle {
            guard: SequenceGuard::new(),
        };
        Box::into_raw(Box::new(handle)) as IdtpSequenceGuardHandle
    })
}

/// Record `sequence` for `device_id`.
///
/// Returns `REPLAYED` when `sequence` is not strictly above the device's
/// current watermark.
///
/// # Safety
/// `guard` must be a valid handle returned by `idtp_sequence_guard_new`.
#[no_mangle]
pub unsafe extern "C" fn idtp_sequence_guard_accept(
    guard: IdtpSequenceGuardHandle,
    device_id: u16,
    sequence: u32,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();

        with_guard(guard, IdtpResult::InvalidArgument, |guard| {
            if guard.accept(device_id, sequence) {
                return IdtpResult::Ok;
            }
            let watermark = guard.watermark(device_id).unwrap_or_default();
            error::set_error_message(format!(
                "replayed frame from device {device_id:#06x}: sequence {sequence} <= {watermark}"
            ));
            IdtpResult::Replayed
        })
    })
}

/// Forget the watermark for `device_id`, e.g. after a known device reboot.
///
/// # Safety
/// `guard` must be a valid handle returned by `idtp_sequence_guard_new`.
#[no_mangle]
pub unsafe extern "C" fn idtp_sequence_guard_reset(
    guard: IdtpSequenceGuardHandle,
    device_id: u16,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();

        with_guard(guard, IdtpResult::InvalidArgument, |guard| {
            guard.reset(device_id);
            IdtpResult::Ok
        })
    })
}

/// Free a sequence guard handle.
///
/// # Safety
/// `guard` must be null or a handle previously returned by `idtp_sequence_guard_new`.
#[no_mangle]
pub unsafe extern "C" fn idtp_sequence_guard_free(guard: IdtpSequenceGuardHandle) {
    crate::ffi_boundary((), || {
        if guard.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by idtp_sequence_guard_new.
        unsafe {
            drop(Box::from_raw(guard as *mut SequenceGuardHandle));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_lifecycle() {
        let guard = idtp_sequence_guard_new();
        assert!(!guard.is_null());

        // SAFETY: `guard` is a live handle for the whole test.
        unsafe {
            assert_eq!(idtp_sequence_guard_accept(guard, 1, 5), IdtpResult::Ok);
            assert_eq!(idtp_sequence_guard_accept(guard, 1, 5), IdtpResult::Replayed);
            assert_eq!(idtp_sequence_guard_accept(guard, 1, 4), IdtpResult::Replayed);
            assert_eq!(idtp_sequence_guard_accept(guard, 2, 1), IdtpResult::Ok);

            assert_eq!(idtp_sequence_guard_reset(guard, 1), IdtpResult::Ok);
            assert_eq!(idtp_sequence_guard_accept(guard, 1, 0), IdtpResult::Ok);

            idtp_sequence_guard_free(guard);
        }
    }

    #[test]
    fn null_handle_is_rejected() {
        // SAFETY: null is explicitly handled.
        unsafe {
            assert_eq!(
                idtp_sequence_guard_accept(std::ptr::null_mut(), 1, 1),
                IdtpResult::InvalidArgument
            );
            assert_eq!(
                idtp_sequence_guard_reset(std::ptr::null_mut(), 1),
                IdtpResult::InvalidArgument
            );
            idtp_sequence_guard_free(std::ptr::null_mut());
        }
    }
}
