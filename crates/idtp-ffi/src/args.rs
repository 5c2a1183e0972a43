use crate::error;

/// Convert a byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when size > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Convert a writable byte pointer + length into a mutable slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and writable for `len` bytes, and not aliased.
pub(crate) unsafe fn bytes_mut_arg<'a>(
    data: *mut u8,
    len: usize,
    name: &str,
) -> Option<&'a mut [u8]> {
    if len == 0 {
        return Some(&mut []);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when size > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts_mut(data, len) })
}

/// HMAC key argument. A null pointer with zero size means "no key".
///
/// # Safety
/// Same contract as [`bytes_arg`].
pub(crate) unsafe fn key_arg<'a>(key: *const u8, key_size: usize) -> Option<Option<&'a [u8]>> {
    if key.is_null() && key_size == 0 {
        return Some(None);
    }
    // SAFETY: Forwarded caller contract.
    unsafe { bytes_arg(key, key_size, "key") }.map(Some)
}

/// Borrow a required input struct.
///
/// # Safety
/// `value` must be null or point to a valid, initialized `T`.
pub(crate) unsafe fn ref_arg<'a, T>(value: *const T, name: &str) -> Option<&'a T> {
    if value.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }
    // SAFETY: Non-null validated above; validity guaranteed by the caller.
    Some(unsafe { &*value })
}

/// Borrow a required output location.
///
/// # Safety
/// `value` must be null or point to writable memory for a `T`.
pub(crate) unsafe fn out_arg<'a, T>(value: *mut T, name: &str) -> Option<&'a mut T> {
    if value.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null"));
        return None;
    }
    // SAFETY: Non-null validated above; validity guaranteed by the caller.
    Some(unsafe { &mut *value })
}
