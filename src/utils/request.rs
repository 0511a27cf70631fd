use http::{HeaderMap, HeaderName, Uri};
use once_cell::sync::Lazy;

/// Retrieves the value of a specific header.
///
/// Returns `None` if the header is not present or its value is not valid UTF-8.
pub fn get_req_header_value<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|value| value.to_str().ok())
}

/// Retrieves the request authority (host with optional port).
///
/// Prefers the authority from the URI, falls back to the `Host` header.
pub fn get_request_authority<'a>(uri: &'a Uri, headers: &'a HeaderMap) -> Option<&'a str> {
    if let Some(authority) = uri.authority() {
        if !authority.as_str().is_empty() {
            return Some(authority.as_str());
        }
    }
    headers
        .get(http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty())
}

static HTTP_HEADER_X_FORWARDED_FOR: Lazy<HeaderName> =
    Lazy::new(|| HeaderName::from_static("x-forwarded-for"));

static HTTP_HEADER_X_REAL_IP: Lazy<HeaderName> = Lazy::new(|| HeaderName::from_static("x-real-ip"));

/// Gets the client's apparent IP address from common proxy headers.
///
/// The order of precedence is:
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
///
/// Returns an empty string if no IP address can be determined.
pub fn get_client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get(&*HTTP_HEADER_X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            let trimmed_ip = ip.trim();
            if !trimmed_ip.is_empty() {
                return trimmed_ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers
        .get(&*HTTP_HEADER_X_REAL_IP)
        .and_then(|v| v.to_str().ok())
    {
        let trimmed_ip = real_ip.trim();
        if !trimmed_ip.is_empty() {
            return trimmed_ip.to_string();
        }
    }

    log::debug!("Could not determine client IP address");
    String::new()
}

/// Normalizes a routing path: one leading slash, no trailing slash, no empty segments.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
