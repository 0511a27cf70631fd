//! Inbound request model
//!
//! A [`Request`] is either an HTTP request handed over by a host server or a
//! command-line invocation. Both share the small surface the dispatcher needs:
//! a path to route, a method, a locale slot and a printable URI.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

use crate::utils::request::{get_req_header_value, get_request_authority, normalize_path};

/// Method reported by command-line requests
pub const CLI_METHOD: &str = "CLI";

#[derive(Debug)]
pub enum Request {
    Incoming(IncomingRequest),
    Cli(CliRequest),
}

impl Request {
    pub fn path(&self) -> String {
        match self {
            Request::Incoming(req) => req.path().to_string(),
            Request::Cli(req) => req.path(),
        }
    }

    pub fn method(&self) -> &str {
        match self {
            Request::Incoming(req) => req.method.as_str(),
            Request::Cli(_) => CLI_METHOD,
        }
    }

    pub fn locale(&self) -> Option<&str> {
        match self {
            Request::Incoming(req) => req.locale.as_deref(),
            Request::Cli(req) => req.locale.as_deref(),
        }
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        let locale = Some(locale.into());
        match self {
            Request::Incoming(req) => req.locale = locale,
            Request::Cli(req) => req.locale = locale,
        }
    }

    /// Full URI as stored for "previous URL" tracking
    pub fn uri_string(&self) -> String {
        match self {
            Request::Incoming(req) => req.uri_string(),
            Request::Cli(req) => req.path(),
        }
    }

    pub fn is_cli(&self) -> bool {
        matches!(self, Request::Cli(_))
    }

    /// CLI requests count as secure: transport security does not apply to them
    pub fn is_secure(&self) -> bool {
        match self {
            Request::Incoming(req) => req.secure,
            Request::Cli(_) => true,
        }
    }

    /// Protocol version, only known for the HTTP transport
    pub fn version(&self) -> Option<Version> {
        match self {
            Request::Incoming(req) => Some(req.version),
            Request::Cli(_) => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        match self {
            Request::Incoming(req) => get_req_header_value(&req.headers, name),
            Request::Cli(_) => None,
        }
    }

    pub fn as_incoming(&self) -> Option<&IncomingRequest> {
        match self {
            Request::Incoming(req) => Some(req),
            Request::Cli(_) => None,
        }
    }

    pub fn as_cli(&self) -> Option<&CliRequest> {
        match self {
            Request::Cli(req) => Some(req),
            Request::Incoming(_) => None,
        }
    }
}

impl From<IncomingRequest> for Request {
    fn from(req: IncomingRequest) -> Self {
        Request::Incoming(req)
    }
}

impl From<CliRequest> for Request {
    fn from(req: CliRequest) -> Self {
        Request::Cli(req)
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        Request::Incoming(IncomingRequest::from_http(req))
    }
}

/// A request received over HTTP
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub version: Version,
    pub body: Bytes,
    pub secure: bool,
    locale: Option<String>,
}

impl IncomingRequest {
    /// Build from an `http::Request`. The request is secure when the URI
    /// scheme is `https` or a fronting proxy reports `X-Forwarded-Proto: https`.
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let forwarded_https = get_req_header_value(&parts.headers, "x-forwarded-proto")
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
        let secure = parts.uri.scheme_str() == Some("https") || forwarded_https;

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            version: parts.version,
            body,
            secure,
            locale: None,
        }
    }

    /// Override the transport security flag reported by the host
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    pub fn authority(&self) -> Option<&str> {
        get_request_authority(&self.uri, &self.headers)
    }

    fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    /// `scheme://authority/path?query`, or only `/path?query` when no authority is known
    pub fn uri_string(&self) -> String {
        match self.authority() {
            Some(authority) => format!("{}://{}{}", self.scheme(), authority, self.path_and_query()),
            None => self.path_and_query().to_string(),
        }
    }

    /// The `https://` equivalent of this request's URL. `fallback_authority`
    /// is used when the request itself names no host.
    pub fn https_url(&self, fallback_authority: Option<&str>) -> String {
        let authority = self
            .authority()
            .or(fallback_authority)
            .unwrap_or("localhost");
        format!("https://{}{}", authority, self.path_and_query())
    }
}

/// A command-line invocation: positional segments plus `--name value` options
#[derive(Debug, Clone, Default)]
pub struct CliRequest {
    segments: Vec<String>,
    options: BTreeMap<String, String>,
    locale: Option<String>,
}

impl CliRequest {
    /// Parse arguments (program name excluded). `--name value` becomes an
    /// option; a `--flag` followed by another option or nothing gets an
    /// empty value. Everything else is a positional segment.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments = Vec::new();
        let mut options = BTreeMap::new();
        let mut args = args.into_iter().map(Into::into).peekable();

        while let Some(arg) = args.next() {
            if let Some(name) = arg.strip_prefix("--") {
                if name.is_empty() {
                    continue;
                }
                let value = match args.peek() {
                    Some(next) if !next.starts_with("--") => args.next().unwrap_or_default(),
                    _ => String::new(),
                };
                options.insert(name.to_string(), value);
            } else if !arg.is_empty() {
                segments.push(arg);
            }
        }

        Self {
            segments,
            options,
            locale: None,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn path(&self) -> String {
        normalize_path(&self.segments.join("/"))
    }
}
