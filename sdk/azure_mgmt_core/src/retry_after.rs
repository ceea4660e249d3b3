//! Server-suggested delay parsing.

use std::time::Duration;

use reqwest::header::HeaderMap;

/// Millisecond headers, checked first.
const RETRY_AFTER_MS_HEADERS: [&str; 2] = ["retry-after-ms", "x-ms-retry-after-ms"];

/// Read the server-suggested delay from response headers.
///
/// Recognizes `retry-after-ms`, `x-ms-retry-after-ms`, and `Retry-After` in
/// delta-seconds form. HTTP-date values are ignored.
pub fn from_headers(headers: &HeaderMap) -> Option<Duration> {
    for name in RETRY_AFTER_MS_HEADERS {
        if let Some(ms) = header_u64(headers, name) {
            return Some(Duration::from_millis(ms));
        }
    }
    header_u64(headers, "retry-after").map(Duration::from_secs)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
