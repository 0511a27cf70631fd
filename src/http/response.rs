//! Outbound response model

use bytes::{Bytes, BytesMut};
use http::{header, HeaderName, HeaderValue, StatusCode, Version};

use crate::core::DispatchResult;

/// Standard content types
pub mod content_type {
    pub const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";
    pub const TEXT_HTML: &str = "text/html; charset=UTF-8";
    pub const APPLICATION_JSON: &str = "application/json";
}

/// Response under construction for one request.
///
/// Header names are unique case-insensitively; insertion order is kept so
/// that emission and cache replay see headers in the order they were set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
    version: Version,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Bytes::new(),
            version: Version::HTTP_11,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Plain-text response with the given status and body
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut resp = Self::with_status(status);
        resp.set_header(header::CONTENT_TYPE.as_str(), content_type::TEXT_PLAIN);
        resp.set_body(body);
        resp
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    pub fn append_body(&mut self, more: &[u8]) {
        if more.is_empty() {
            return;
        }
        let mut buf = BytesMut::with_capacity(self.body.len() + more.len());
        buf.extend_from_slice(&self.body);
        buf.extend_from_slice(more);
        self.body = buf.freeze();
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Set a header, replacing any value stored under the same name
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn remove_header(&mut self, name: &str) -> bool {
        let before = self.headers.len();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before != self.headers.len()
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// Turn this response into a redirect. Codes outside 3xx fall back to 302.
    pub fn redirect(&mut self, target: &str, code: u16) {
        let status = StatusCode::from_u16(code)
            .ok()
            .filter(StatusCode::is_redirection)
            .unwrap_or(StatusCode::FOUND);
        self.status = status;
        self.set_header(header::LOCATION.as_str(), target);
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.has_header(header::LOCATION.as_str())
    }

    /// Convert into an `http::Response` for hosts that speak the `http` crate types
    pub fn into_http(self) -> DispatchResult<http::Response<Bytes>> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .version(self.version);
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| crate::core::DispatchError::InvalidHeader(format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| crate::core::DispatchError::InvalidHeader(format!("{name}: {e}")))?;
            builder = builder.header(name, value);
        }
        Ok(builder.body(self.body)?)
    }
}
