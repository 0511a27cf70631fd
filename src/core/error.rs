//! Unified error handling for ignition
//!
//! Redirects and "page not found" are not errors here: routing reports them
//! as [`crate::router::RouteOutcome`] variants and the dispatcher answers them
//! itself. Everything in [`DispatchError`] is a genuine failure that either
//! aborts the current request or escapes to the host's error boundary.

use std::fmt;

/// Failures surfaced while serving a request or building the application
#[derive(Debug)]
pub enum DispatchError {
    /// Configuration-related errors
    Configuration(String),

    /// File and stream I/O errors
    Io(std::io::Error),

    /// A stored page cache entry could not be decoded
    CacheCorrupt(String),

    /// Cache store or envelope encoding failures
    Cache(String),

    /// A named handler could not be constructed
    HandlerConstruction(String),

    /// A handler failed while running
    Handler(String),

    /// A filter failed while running
    Filter(String),

    /// The response could not be delivered
    Emit(String),

    /// Header name or value rejected by the HTTP layer
    InvalidHeader(String),

    /// Internal system errors
    Internal(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            DispatchError::Io(err) => write!(f, "I/O error: {err}"),
            DispatchError::CacheCorrupt(msg) => write!(f, "Error unserializing page cache: {msg}"),
            DispatchError::Cache(msg) => write!(f, "Cache error: {msg}"),
            DispatchError::HandlerConstruction(msg) => {
                write!(f, "Handler construction failed: {msg}")
            }
            DispatchError::Handler(msg) => write!(f, "Handler execution error: {msg}"),
            DispatchError::Filter(msg) => write!(f, "Filter execution error: {msg}"),
            DispatchError::Emit(msg) => write!(f, "Failed to send response: {msg}"),
            DispatchError::InvalidHeader(msg) => write!(f, "Invalid header: {msg}"),
            DispatchError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::Io(err)
    }
}

impl From<http::Error> for DispatchError {
    fn from(err: http::Error) -> Self {
        DispatchError::InvalidHeader(err.to_string())
    }
}

impl From<serde_yaml::Error> for DispatchError {
    fn from(err: serde_yaml::Error) -> Self {
        DispatchError::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for DispatchError {
    fn from(err: validator::ValidationErrors) -> Self {
        DispatchError::Configuration(err.to_string())
    }
}

/// Result type alias for dispatch operations
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> DispatchResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> DispatchResult<T> {
        self.map_err(|e| DispatchError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::DispatchError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::DispatchError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::core::DispatchError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::DispatchError::Internal(format!($fmt, $($arg)*))
    };
}
