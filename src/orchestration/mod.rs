//! Request orchestration layer
//!
//! Drives one request through the collaborators held by the
//! [`ServiceContainer`](crate::core::ServiceContainer).

pub mod dispatcher;
mod not_found;

#[cfg(test)]
mod tests;

pub use dispatcher::{Dispatcher, PerformanceStats};
