//! C-ABI wrapper around `jequests-core`.
//!
//! # Overview
//! Exposes `request`, `escape` and `unescape` through `extern "C"` functions
//! so a scripting-language host can bind them without linking Rust directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Host values are marshaled here: null pointers, non-UTF-8 header entries
//!   and the method token are checked before the core is called, in the order
//!   method, POST body, headers.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data` conveys
//!   success payloads and errors uniformly.
//! - The C caller owns every returned pointer and releases it with
//!   `jequests_free_result`.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::catch_unwind;
use std::sync::Once;

use jequests_core::{HttpRequest, Method, RequestError, RequestExecutor, UreqEngine};
use tracing_subscriber::EnvFilter;

use types::*;

static LOGGING: Once = Once::new();

fn executor() -> RequestExecutor<&'static UreqEngine> {
    RequestExecutor::new(UreqEngine::global())
}

/// Install a stderr `tracing` subscriber when `JEQUESTS_LOG` is set.
fn init_logging() {
    LOGGING.call_once(|| {
        if let Ok(filter) = std::env::var("JEQUESTS_LOG") {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(filter))
                .with_writer(std::io::stderr)
                .try_init();
        }
    });
}

/// Read the host's header entries. The first null or non-UTF-8 entry fails
/// the whole request.
///
/// # Safety
/// `headers` must point to `len` readable entries when non-null.
unsafe fn header_lines(headers: *const *const c_char, len: usize) -> Result<Vec<String>, RequestError> {
    if headers.is_null() || len == 0 {
        return Ok(Vec::new());
    }
    let entries = unsafe { std::slice::from_raw_parts(headers, len) };
    entries
        .iter()
        .enumerate()
        .map(|(index, &entry)| {
            if entry.is_null() {
                return Err(RequestError::InvalidHeader {
                    index,
                    value: "nil".to_string(),
                });
            }
            let raw = unsafe { CStr::from_ptr(entry) };
            raw.to_str()
                .map(str::to_string)
                .map_err(|_| RequestError::InvalidHeader {
                    index,
                    value: format!("{raw:?}"),
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Initialize the transfer engine and optional logging.
///
/// Safe to call any number of times; only the first call does work. Other
/// entry points initialize lazily, so calling this is optional but lets the
/// host fail early. Returns false only if initialization panicked.
#[unsafe(no_mangle)]
pub extern "C" fn jequests_init() -> bool {
    catch_unwind(|| {
        init_logging();
        UreqEngine::global();
        true
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Perform one blocking HTTP request.
///
/// `method` is a lowercase token (`"get"`, `"post"`, ...). `body` may be null
/// (no body); otherwise `body_len` bytes are sent, NULs included. `headers`
/// may be null when `headers_len` is zero; each entry is a raw
/// `"Name: value"` line.
///
/// Returns a result with `data_tag = Response` on success.
#[unsafe(no_mangle)]
pub extern "C" fn jequests_request(
    method: *const c_char,
    url: *const c_char,
    body: *const u8,
    body_len: usize,
    headers: *const *const c_char,
    headers_len: usize,
) -> *mut FfiResult {
    catch_unwind(|| {
        init_logging();
        if method.is_null() {
            return FfiResult::null_arg("method");
        }
        if url.is_null() {
            return FfiResult::null_arg("url");
        }
        if headers.is_null() && headers_len > 0 {
            return FfiResult::null_arg("headers");
        }

        let token = unsafe { CStr::from_ptr(method) }.to_string_lossy();
        let method: Method = match token.parse() {
            Ok(m) => m,
            Err(e) => return FfiResult::from_error(e),
        };
        let url = unsafe { CStr::from_ptr(url) }
            .to_string_lossy()
            .into_owned();
        let body = if body.is_null() {
            None
        } else {
            Some(unsafe { std::slice::from_raw_parts(body, body_len) }.to_vec())
        };
        if method == Method::Post && body.is_none() {
            return FfiResult::from_error(RequestError::MissingBody);
        }
        let headers = match unsafe { header_lines(headers, headers_len) } {
            Ok(h) => h,
            Err(e) => return FfiResult::from_error(e),
        };

        let request = HttpRequest {
            method,
            url,
            body,
            headers,
        };
        match executor().execute(request) {
            Ok(resp) => FfiResult::ok_response(resp),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in jequests_request"))
}

/// Percent-encode `len` bytes at `input`.
///
/// Returns a result with `data_tag = Bytes` holding the ASCII output.
#[unsafe(no_mangle)]
pub extern "C" fn jequests_escape(input: *const u8, len: usize) -> *mut FfiResult {
    catch_unwind(|| {
        init_logging();
        if input.is_null() && len > 0 {
            return FfiResult::null_arg("input");
        }
        let bytes: &[u8] = if input.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(input, len) }
        };
        match executor().escape(bytes) {
            Ok(escaped) => FfiResult::ok_bytes(escaped.into_bytes()),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in jequests_escape"))
}

/// Percent-decode `len` bytes at `input`.
///
/// Returns a result with `data_tag = Bytes`; the decoded length is explicit
/// and the bytes may contain NULs.
#[unsafe(no_mangle)]
pub extern "C" fn jequests_unescape(input: *const u8, len: usize) -> *mut FfiResult {
    catch_unwind(|| {
        init_logging();
        if input.is_null() && len > 0 {
            return FfiResult::null_arg("input");
        }
        let bytes: &[u8] = if input.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(input, len) }
        };
        match executor().unescape(bytes) {
            Ok(decoded) => FfiResult::ok_bytes(decoded),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in jequests_unescape"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any `jequests_*` operation.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn jequests_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { std::ffi::CString::from_raw(result.error_message) });
        }
        if !result.data.is_null() {
            match result.data_tag {
                FfiDataTag::Response => {
                    let resp = unsafe { Box::from_raw(result.data as *mut FfiResponse) };
                    unsafe { resp.free() };
                }
                FfiDataTag::Bytes => {
                    let bytes = unsafe { Box::from_raw(result.data as *mut FfiBytes) };
                    unsafe { bytes.free() };
                }
                FfiDataTag::None => {}
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::net::SocketAddr;

    fn start_server() -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run(listener).await
            })
            .unwrap();
        });

        addr
    }

    fn message(r: &FfiResult) -> String {
        unsafe { CStr::from_ptr(r.error_message) }
            .to_str()
            .unwrap()
            .to_string()
    }

    fn bytes_of(r: &FfiResult) -> Vec<u8> {
        assert!(matches!(r.data_tag, FfiDataTag::Bytes));
        let bytes = unsafe { &*(r.data as *const FfiBytes) };
        if bytes.len == 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(bytes.data, bytes.len) }.to_vec()
    }

    fn request(
        method: &str,
        url: &str,
        body: Option<&[u8]>,
        headers: &[*const c_char],
    ) -> *mut FfiResult {
        let method = CString::new(method).unwrap();
        let url = CString::new(url).unwrap();
        let (body_ptr, body_len) = match body {
            Some(b) => (b.as_ptr(), b.len()),
            None => (std::ptr::null(), 0),
        };
        jequests_request(
            method.as_ptr(),
            url.as_ptr(),
            body_ptr,
            body_len,
            headers.as_ptr(),
            headers.len(),
        )
    }

    #[test]
    fn init_is_idempotent() {
        assert!(jequests_init());
        assert!(jequests_init());
    }

    #[test]
    fn null_method_returns_null_arg() {
        let url = CString::new("http://localhost").unwrap();
        let result = jequests_request(std::ptr::null(), url.as_ptr(), std::ptr::null(), 0, std::ptr::null(), 0);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        assert_eq!(message(r), "null argument: method");
        jequests_free_result(result);
    }

    #[test]
    fn null_url_returns_null_arg() {
        let method = CString::new("get").unwrap();
        let result = jequests_request(method.as_ptr(), std::ptr::null(), std::ptr::null(), 0, std::ptr::null(), 0);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        jequests_free_result(result);
    }

    #[test]
    fn unknown_method_is_reported() {
        let result = request("fetch", "http://localhost", None, &[]);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::UnknownMethod);
        assert_eq!(message(r), "unknown http method fetch");
        assert!(r.data.is_null());
        jequests_free_result(result);
    }

    #[test]
    fn post_without_body_is_reported() {
        let result = request("post", "http://localhost", None, &[]);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::MissingBody);
        jequests_free_result(result);
    }

    #[test]
    fn null_header_entry_is_reported_with_index() {
        let ok = CString::new("X-A: 1").unwrap();
        let headers = [std::ptr::null(), ok.as_ptr()];
        let result = request("get", "http://localhost", None, &headers);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidHeader);
        assert!(message(r).contains("index 0"));
        jequests_free_result(result);
    }

    #[test]
    fn non_utf8_header_entry_is_reported_with_index() {
        let ok = CString::new("X-A: 1").unwrap();
        let bad = CString::new(vec![0xffu8, 0xfe]).unwrap();
        let headers = [ok.as_ptr(), bad.as_ptr()];
        let result = request("get", "http://localhost", None, &headers);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::InvalidHeader);
        assert!(message(r).contains("index 1"));
        jequests_free_result(result);
    }

    #[test]
    fn request_returns_status_body_and_headers() {
        let addr = start_server();
        let header = CString::new("X-Trace: abc").unwrap();
        let result = request(
            "post",
            &format!("http://{addr}/echo"),
            Some(b"a\0b"),
            &[header.as_ptr()],
        );
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(r.error_message.is_null());
        assert!(matches!(r.data_tag, FfiDataTag::Response));

        let resp = unsafe { &*(r.data as *const FfiResponse) };
        assert_eq!(resp.status_code, 200);
        let body = unsafe { std::slice::from_raw_parts(resp.body.data, resp.body.len) };
        assert_eq!(body, b"a\0b");

        let lines = unsafe { std::slice::from_raw_parts(resp.headers, resp.headers_len) };
        let lines: Vec<String> = lines
            .iter()
            .map(|l| unsafe { CStr::from_ptr(*l) }.to_str().unwrap().to_string())
            .collect();
        assert!(lines.contains(&"x-echo-method: POST".to_string()));
        assert!(lines.iter().all(|l| !l.starts_with("HTTP/")));

        jequests_free_result(result);
    }

    #[test]
    fn headers_reach_the_server() {
        let addr = start_server();
        let header = CString::new("X-Trace: abc").unwrap();
        let result = request("get", &format!("http://{addr}/inspect"), None, &[header.as_ptr()]);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);

        let resp = unsafe { &*(r.data as *const FfiResponse) };
        let body = unsafe { std::slice::from_raw_parts(resp.body.data, resp.body.len) };
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["method"], "GET");
        let headers = json["headers"].as_array().unwrap();
        assert!(headers
            .iter()
            .any(|h| h[0] == "x-trace" && h[1] == "abc"));

        jequests_free_result(result);
    }

    #[test]
    fn unreachable_host_is_transfer_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let result = request("get", &format!("http://127.0.0.1:{port}/"), None, &[]);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Transfer);
        assert!(!message(r).is_empty());
        assert!(r.data.is_null());
        jequests_free_result(result);
    }

    #[test]
    fn escape_and_unescape_round_trip_with_nul() {
        let input = b"a b/c\0";
        let escaped = jequests_escape(input.as_ptr(), input.len());
        let escaped_bytes = bytes_of(unsafe { &*escaped });
        assert_eq!(escaped_bytes, b"a%20b%2Fc%00");

        let decoded = jequests_unescape(escaped_bytes.as_ptr(), escaped_bytes.len());
        let decoded_bytes = bytes_of(unsafe { &*decoded });
        assert_eq!(decoded_bytes, input.to_vec());

        jequests_free_result(escaped);
        jequests_free_result(decoded);
    }

    #[test]
    fn unescape_reports_explicit_length_for_nul() {
        let input = b"%00";
        let result = jequests_unescape(input.as_ptr(), input.len());
        let r = unsafe { &*result };
        let bytes = unsafe { &*(r.data as *const FfiBytes) };
        assert_eq!(bytes.len, 1);
        assert_eq!(bytes_of(r), vec![0u8]);
        jequests_free_result(result);
    }

    #[test]
    fn escape_empty_input() {
        let result = jequests_escape(std::ptr::null(), 0);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::Ok);
        assert!(bytes_of(r).is_empty());
        jequests_free_result(result);
    }

    #[test]
    fn escape_null_with_length_returns_null_arg() {
        let result = jequests_escape(std::ptr::null(), 4);
        let r = unsafe { &*result };
        assert_eq!(r.error_code, FfiErrorCode::NullArg);
        jequests_free_result(result);
    }

    #[test]
    fn free_result_null_is_safe() {
        jequests_free_result(std::ptr::null_mut());
    }
}
