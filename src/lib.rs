//! ignition: the request lifecycle of a small web framework.
//!
//! One [`orchestration::Dispatcher`] takes one request (HTTP or command line)
//! through transport security, the page cache, routing, filters and handler
//! invocation, then hands the response to the configured emitter.

pub mod cache;
pub mod config;
pub mod core;
pub mod filter;
pub mod handler;
pub mod hooks;
pub mod http;
pub mod logging;
pub mod orchestration;
pub mod router;
pub mod session;
pub(crate) mod utils;
