//! Request context management
//!
//! [`RequestContext`] holds the per-request state that filters and handlers
//! share with the dispatcher: the output buffer, the page caching directive,
//! the before-filter halt slot and free-form typed variables.

use std::{any::Any, collections::HashMap, fmt, io, time::Instant};

use bytes::{Bytes, BytesMut};

use crate::http::response::Response;

/// Explicit output capture for one request
#[derive(Debug, Default)]
pub struct OutputBuffer {
    buf: BytesMut,
}

impl OutputBuffer {
    pub fn push(&mut self, data: impl AsRef<[u8]>) {
        self.buf.extend_from_slice(data.as_ref());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take everything written so far, leaving the buffer empty
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl fmt::Write for OutputBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s);
        Ok(())
    }
}

impl io::Write for OutputBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.push(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Context that holds per-request state and metadata
pub struct RequestContext {
    /// Output written by handlers instead of (or in addition to) a return value
    pub output: OutputBuffer,

    /// Positional parameters of the matched route
    pub route_params: Vec<String>,

    cache_ttl: i64,
    halt: Option<Response>,

    /// Custom variables available to filters and handlers (type-erased, thread-safe)
    vars: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Default for RequestContext {
    fn default() -> Self {
        let mut vars: HashMap<String, Box<dyn Any + Send + Sync>> = HashMap::new();
        vars.insert("request_start".to_string(), Box::new(Instant::now()));

        Self {
            output: OutputBuffer::default(),
            route_params: Vec::new(),
            cache_ttl: 0,
            halt: None,
            vars,
        }
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for the page to be cached for `ttl` seconds. Last write wins;
    /// zero or a negative value disables caching.
    pub fn cache_for(&mut self, ttl: i64) {
        self.cache_ttl = ttl;
    }

    pub fn cache_ttl(&self) -> i64 {
        self.cache_ttl
    }

    /// Stop the request from a before filter and send `response` as is
    pub fn halt(&mut self, response: Response) {
        self.halt = Some(response);
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_some()
    }

    pub fn take_halt(&mut self) -> Option<Response> {
        self.halt.take()
    }

    /// Write text to the output buffer
    pub fn echo(&mut self, text: impl AsRef<[u8]>) {
        self.output.push(text);
    }

    pub fn request_start(&self) -> Option<Instant> {
        self.get::<Instant>("request_start").copied()
    }

    /// Store a typed value into the context
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.vars.insert(key.into(), Box::new(value));
    }

    /// Get a typed reference from the context
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.vars.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Get a string slice if the stored value is a `String`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get::<String>(key).map(|s| s.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.vars.remove(key)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("output_len", &self.output.len())
            .field("route_params", &self.route_params)
            .field("cache_ttl", &self.cache_ttl)
            .field("halted", &self.halt.is_some())
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}
