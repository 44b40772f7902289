//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Byte payloads cross the boundary as pointer + explicit length so embedded
//! NULs survive. Header lines are NUL-terminated C strings. Every result is a
//! single `FfiResult` envelope; the C caller frees it with
//! `jequests_free_result`, which uses `data_tag` to know what `data` owns.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use jequests_core::{ErrorKind, HttpResponse, RequestError};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// An owned byte buffer. `data` is null when `len` is zero.
#[repr(C)]
pub struct FfiBytes {
    pub data: *mut u8,
    pub len: usize,
}

impl FfiBytes {
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return FfiBytes {
                data: std::ptr::null_mut(),
                len: 0,
            };
        }
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        FfiBytes {
            data: Box::into_raw(boxed) as *mut u8,
            len,
        }
    }

    /// Release the buffer. Must only be called once per `from_vec`.
    pub(crate) unsafe fn free(&self) {
        if !self.data.is_null() && self.len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(self.data, self.len);
            drop(unsafe { Box::from_raw(slice) });
        }
    }
}

/// A response exposed to C.
#[repr(C)]
pub struct FfiResponse {
    pub status_code: i32,
    pub body: FfiBytes,
    pub headers: *mut *mut c_char,
    pub headers_len: usize,
}

impl FfiResponse {
    pub(crate) fn from_core(resp: HttpResponse) -> Self {
        let headers_len = resp.headers.len();
        let headers = if resp.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let lines: Box<[*mut c_char]> = resp
                .headers
                .into_iter()
                .map(|line| to_c_string(line).into_raw())
                .collect();
            Box::into_raw(lines) as *mut *mut c_char
        };

        FfiResponse {
            status_code: i32::from(resp.status_code),
            body: FfiBytes::from_vec(resp.body),
            headers,
            headers_len,
        }
    }

    pub(crate) unsafe fn free(&self) {
        unsafe { self.body.free() };
        if !self.headers.is_null() && self.headers_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(self.headers, self.headers_len);
            let lines = unsafe { Box::from_raw(slice) };
            for line in lines.iter() {
                if !line.is_null() {
                    drop(unsafe { CString::from_raw(*line) });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    UnknownMethod = 1,
    MissingBody = 2,
    InvalidHeader = 3,
    SessionUnavailable = 4,
    Transfer = 5,
    HandleUnavailable = 6,
    NullArg = 7,
    Panic = 8,
}

impl From<ErrorKind> for FfiErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::UnknownMethod => FfiErrorCode::UnknownMethod,
            ErrorKind::MissingBody => FfiErrorCode::MissingBody,
            ErrorKind::InvalidHeader => FfiErrorCode::InvalidHeader,
            ErrorKind::SessionUnavailable => FfiErrorCode::SessionUnavailable,
            ErrorKind::Transfer => FfiErrorCode::Transfer,
            ErrorKind::HandleUnavailable => FfiErrorCode::HandleUnavailable,
        }
    }
}

/// Tag that tells `jequests_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Response = 1,
    Bytes = 2,
}

/// Result envelope for every operation.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag`. On failure `error_message` is
/// a human-readable C string and `data` is null.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    pub(crate) fn ok_response(resp: HttpResponse) -> *mut Self {
        let data = Box::into_raw(Box::new(FfiResponse::from_core(resp)));
        Self::ok(FfiDataTag::Response, data as *mut c_void)
    }

    pub(crate) fn ok_bytes(bytes: Vec<u8>) -> *mut Self {
        let data = Box::into_raw(Box::new(FfiBytes::from_vec(bytes)));
        Self::ok(FfiDataTag::Bytes, data as *mut c_void)
    }

    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            data_tag,
            data,
        }))
    }

    pub(crate) fn from_error(err: RequestError) -> *mut Self {
        Self::err(err.kind().into(), err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, msg.to_string())
    }

    fn err(error_code: FfiErrorCode, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: to_c_string(msg).into_raw(),
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }
}

/// Convert to a C string, truncating at the first interior NUL.
fn to_c_string(s: String) -> CString {
    match CString::new(s) {
        Ok(c) => c,
        Err(err) => {
            let nul = err.nul_position();
            let mut bytes = err.into_vec();
            bytes.truncate(nul);
            CString::new(bytes).unwrap_or_default()
        }
    }
}
