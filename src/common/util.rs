use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use std::borrow::Cow;

// ===============================================================================================
// Environment
// ===============================================================================================
#[doc(hidden)]
pub(crate) fn read_env(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) => value,
        Err(_) => default.to_string(),
    }
}

// ===============================================================================================
// Requests
// ===============================================================================================
/// `http::Request` is not `Clone` because of its extensions. Transports only ever look at
/// method, URI, version, headers and body, so those are the parts that are copied.
pub fn clone_request(req: &http::Request<Bytes>) -> http::Request<Bytes> {
    let mut builder = http::Request::builder()
        .method(req.method().clone())
        .uri(req.uri().clone())
        .version(req.version());

    if let Some(headers) = builder.headers_mut() {
        headers.extend(req.headers().clone());
    }

    // Every part was taken from a valid request, so the builder cannot fail.
    builder
        .body(req.body().clone())
        .unwrap_or_else(|_| http::Request::new(req.body().clone()))
}

// ===============================================================================================
// Bytes
// ===============================================================================================
/// Finds the first position of `needle` in `haystack` at or after `from`.
pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|idx| idx + from)
}

/// Converts the bytes to a UTF-8 string, replacing invalid sequences if required.
pub(crate) fn to_maybe_lossy_str(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(valid_str) => Cow::Borrowed(valid_str),
        Err(_) => Cow::Owned(String::from_utf8_lossy(bytes).to_string()),
    }
}

/// Renders a body for debug output: UTF-8 text as is, anything else as Base64.
pub(crate) fn printable_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(result) => result.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}
