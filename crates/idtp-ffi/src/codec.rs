use idtp_frame::{FrameCodec, Header, IntegrityEngine, SoftwareEngine};

use crate::args::{bytes_arg, bytes_mut_arg, key_arg, out_arg, ref_arg};
use crate::engine::CallbackEngine;
use crate::error;
use crate::types::{IdtpHeader, IdtpIntegrityFns, IdtpResult};

/// Fill `header` with the protocol defaults: preamble, version and Safety mode.
///
/// # Safety
/// `header` must be null or point to writable memory for an `IdtpHeader`.
#[no_mangle]
pub unsafe extern "C" fn idtp_header_init(header: *mut IdtpHeader) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();

        // SAFETY: We validate null in helper.
        match unsafe { out_arg(header, "header") } {
            Some(out) => {
                *out = Header::new().into();
                IdtpResult::Ok
            }
            None => IdtpResult::InvalidArgument,
        }
    })
}

/// Pack a frame into `buffer` using the built-in CRC/HMAC implementations.
///
/// `payload_size`, the header CRC-8 and the trailer are computed; the values
/// in `header` are ignored. Pass a null `key` with `key_size == 0` for Lite
/// and Safety frames.
///
/// # Safety
/// `header` and `frame_size` must be valid pointers. `payload`, `key` and
/// `buffer` must be readable (writable for `buffer`) for their sizes when
/// those sizes are non-zero.
#[no_mangle]
pub unsafe extern "C" fn idtp_pack(
    header: *const IdtpHeader,
    payload: *const u8,
    payload_size: usize,
    key: *const u8,
    key_size: usize,
    buffer: *mut u8,
    buffer_size: usize,
    frame_size: *mut usize,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();
        // SAFETY: Forwarded caller contract.
        unsafe {
            pack_raw(
                &SoftwareEngine,
                header,
                payload,
                payload_size,
                key,
                key_size,
                buffer,
                buffer_size,
                frame_size,
            )
        }
    })
}

/// Like [`idtp_pack`], with caller-supplied integrity callbacks.
///
/// # Safety
/// As for [`idtp_pack`]; additionally `fns` must point to a valid
/// `IdtpIntegrityFns` whose non-null entries honor their documented contracts.
#[no_mangle]
pub unsafe extern "C" fn idtp_pack_with(
    header: *const IdtpHeader,
    payload: *const u8,
    payload_size: usize,
    key: *const u8,
    key_size: usize,
    buffer: *mut u8,
    buffer_size: usize,
    fns: *const IdtpIntegrityFns,
    frame_size: *mut usize,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();

        // SAFETY: We validate null in helper.
        let Some(fns) = (unsafe { ref_arg(fns, "fns") }) else {
            return IdtpResult::InvalidArgument;
        };
        let engine = CallbackEngine::new(*fns);
        // SAFETY: Forwarded caller contract.
        let result = unsafe {
            pack_raw(
                &engine,
                header,
                payload,
                payload_size,
                key,
                key_size,
                buffer,
                buffer_size,
                frame_size,
            )
        };
        if let Some(failure) = callback_failure(&engine) {
            // SAFETY: Forwarded caller contract; null is tolerated.
            if let Some(frame_size) = unsafe { frame_size.as_mut() } {
                *frame_size = 0;
            }
            return failure;
        }
        result
    })
}

/// Check the frame at the start of `buffer` and report its size.
///
/// # Safety
/// `buffer` and `key` must be readable for their sizes when non-zero;
/// `frame_size` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn idtp_validate(
    buffer: *const u8,
    buffer_size: usize,
    key: *const u8,
    key_size: usize,
    frame_size: *mut usize,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();
        // SAFETY: Forwarded caller contract.
        unsafe { validate_raw(&SoftwareEngine, buffer, buffer_size, key, key_size, frame_size) }
    })
}

/// Like [`idtp_validate`], with caller-supplied integrity callbacks.
///
/// # Safety
/// As for [`idtp_validate`]; additionally `fns` must point to a valid
/// `IdtpIntegrityFns`.
#[no_mangle]
pub unsafe extern "C" fn idtp_validate_with(
    buffer: *const u8,
    buffer_size: usize,
    key: *const u8,
    key_size: usize,
    fns: *const IdtpIntegrityFns,
    frame_size: *mut usize,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();

        // SAFETY: We validate null in helper.
        let Some(fns) = (unsafe { ref_arg(fns, "fns") }) else {
            return IdtpResult::InvalidArgument;
        };
        let engine = CallbackEngine::new(*fns);
        // SAFETY: Forwarded caller contract.
        let result =
            unsafe { validate_raw(&engine, buffer, buffer_size, key, key_size, frame_size) };
        if let Some(failure) = callback_failure(&engine) {
            // SAFETY: Forwarded caller contract; null is tolerated.
            if let Some(frame_size) = unsafe { frame_size.as_mut() } {
                *frame_size = 0;
            }
            return failure;
        }
        result
    })
}

/// Validate and decode the frame at the start of `buffer`.
///
/// The header is written to `header_out` and the payload copied into
/// `payload_out`; `payload_capacity` smaller than the payload fails with
/// `BUFFER_UNDERFLOW`.
///
/// # Safety
/// `buffer` and `key` must be readable for their sizes when non-zero;
/// `payload_out` must be writable for `payload_capacity` bytes when non-zero;
/// `header_out` and `payload_size` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn idtp_parse(
    buffer: *const u8,
    buffer_size: usize,
    key: *const u8,
    key_size: usize,
    header_out: *mut IdtpHeader,
    payload_out: *mut u8,
    payload_capacity: usize,
    payload_size: *mut usize,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();
        // SAFETY: Forwarded caller contract.
        unsafe {
            parse_raw(
                &SoftwareEngine,
                buffer,
                buffer_size,
                key,
                key_size,
                header_out,
                payload_out,
                payload_capacity,
                payload_size,
            )
        }
    })
}

/// Like [`idtp_parse`], with caller-supplied integrity callbacks.
///
/// # Safety
/// As for [`idtp_parse`]; additionally `fns` must point to a valid
/// `IdtpIntegrityFns`.
#[no_mangle]
pub unsafe extern "C" fn idtp_parse_with(
    buffer: *const u8,
    buffer_size: usize,
    key: *const u8,
    key_size: usize,
    fns: *const IdtpIntegrityFns,
    header_out: *mut IdtpHeader,
    payload_out: *mut u8,
    payload_capacity: usize,
    payload_size: *mut usize,
) -> IdtpResult {
    crate::ffi_boundary(IdtpResult::Internal, || {
        error::clear_error_state();

        // SAFETY: We validate null in helper.
        let Some(fns) = (unsafe { ref_arg(fns, "fns") }) else {
            return IdtpResult::InvalidArgument;
        };
        let engine = CallbackEngine::new(*fns);
        // SAFETY: Forwarded caller contract.
        let result = unsafe {
            parse_raw(
                &engine,
                buffer,
                buffer_size,
                key,
                key_size,
                header_out,
                payload_out,
                payload_capacity,
                payload_size,
            )
        };
        if let Some(failure) = callback_failure(&engine) {
            // SAFETY: Forwarded caller contract; null is tolerated.
            unsafe {
                if let Some(payload_size) = payload_size.as_mut() {
                    *payload_size = 0;
                }
                if let Some(header_out) = header_out.as_mut() {
                    *header_out = IdtpHeader::default();
                }
            }
            return failure;
        }
        result
    })
}

/// A failed callback voids the codec outcome; the caller must clear outputs.
fn callback_failure(engine: &CallbackEngine) -> Option<IdtpResult> {
    let failure = engine.take_failure()?;
    error::set_error_message(format!("integrity callback failed ({failure:?})"));
    Some(failure)
}

unsafe fn validate_raw<E: IntegrityEngine>(
    engine: &E,
    buffer: *const u8,
    buffer_size: usize,
    key: *const u8,
    key_size: usize,
    frame_size: *mut usize,
) -> IdtpResult {
    // SAFETY: We validate null in helper.
    let Some(frame_size) = (unsafe { out_arg(frame_size, "frame_size") }) else {
        return IdtpResult::InvalidArgument;
    };
    *frame_size = 0;
    // SAFETY: We validate pointer/length pairing in helpers.
    let (Some(src), Some(key)) = (unsafe { bytes_arg(buffer, buffer_size, "buffer") }, unsafe {
        key_arg(key, key_size)
    }) else {
        return IdtpResult::InvalidArgument;
    };

    match FrameCodec::with_engine(engine)
        .with_optional_key(key)
        .validate(src)
    {
        Ok(size) => {
            *frame_size = size;
            IdtpResult::Ok
        }
        Err(err) => error::map_frame_error(&err),
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn pack_raw<E: IntegrityEngine>(
    engine: &E,
    header: *const IdtpHeader,
    payload: *const u8,
    payload_size: usize,
    key: *const u8,
    key_size: usize,
    buffer: *mut u8,
    buffer_size: usize,
    frame_size: *mut usize,
) -> IdtpResult {
    // SAFETY: We validate null in helper.
    let Some(frame_size) = (unsafe { out_arg(frame_size, "frame_size") }) else {
        return IdtpResult::InvalidArgument;
    };
    *frame_size = 0;

    // SAFETY: We validate null in helper.
    let Some(header) = (unsafe { ref_arg(header, "header") }) else {
        return IdtpResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(payload) = (unsafe { bytes_arg(payload, payload_size, "payload") }) else {
        return IdtpResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(key) = (unsafe { key_arg(key, key_size) }) else {
        return IdtpResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(dst) = (unsafe { bytes_mut_arg(buffer, buffer_size, "buffer") }) else {
        return IdtpResult::InvalidArgument;
    };

    let codec = FrameCodec::with_engine(engine).with_optional_key(key);
    match codec.pack(&Header::from(*header), payload, dst) {
        Ok(size) => {
            *frame_size = size;
            IdtpResult::Ok
        }
        Err(err) => error::map_frame_error(&err),
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn parse_raw<E: IntegrityEngine>(
    engine: &E,
    buffer: *const u8,
    buffer_size: usize,
    key: *const u8,
    key_size: usize,
    header_out: *mut IdtpHeader,
    payload_out: *mut u8,
    payload_capacity: usize,
    payload_size: *mut usize,
) -> IdtpResult {
    // SAFETY: We validate null in helper.
    let Some(payload_size) = (unsafe { out_arg(payload_size, "payload_size") }) else {
        return IdtpResult::InvalidArgument;
    };
    *payload_size = 0;

    // SAFETY: We validate null in helper.
    let Some(header_out) = (unsafe { out_arg(header_out, "header_out") }) else {
        return IdtpResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(src) = (unsafe { bytes_arg(buffer, buffer_size, "buffer") }) else {
        return IdtpResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(key) = (unsafe { key_arg(key, key_size) }) else {
        return IdtpResult::InvalidArgument;
    };
    // SAFETY: We validate pointer/length pairing in helper.
    let Some(payload_dst) = (unsafe { bytes_mut_arg(payload_out, payload_capacity, "payload_out") })
    else {
        return IdtpResult::InvalidArgument;
    };

    let codec = FrameCodec::with_engine(engine).with_optional_key(key);
    let frame = match codec.parse(src) {
        Ok(frame) => frame,
        Err(err) => return error::map_frame_error(&err),
    };

    let payload = frame.payload();
    let Some(slot) = payload_dst.get_mut(..payload.len()) else {
        error::set_error_message(format!(
            "payload_out too small ({} bytes needed, {payload_capacity} available)",
            payload.len()
        ));
        return IdtpResult::BufferUnderflow;
    };
    slot.copy_from_slice(payload);
    *header_out = (*frame.header()).into();
    *payload_size = payload.len();
    IdtpResult::Ok
}
