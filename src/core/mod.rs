//! Core abstractions and interfaces for ignition
//!
//! This module provides the foundational traits, types, and utilities
//! shared by routing, filtering, handler invocation and dispatch.

pub mod container;
pub mod context;
pub mod error;
pub mod registry;
pub mod status;
pub mod timer;
pub mod traits;


// Re-export commonly used types
pub use container::{ServiceContainer, ServiceContainerBuilder};
pub use context::RequestContext;
pub use error::{DispatchError, DispatchResult, ErrorContext};
pub use registry::ControllerRegistry;
pub use status::ExitStatus;
pub use timer::Timer;
pub use traits::*;
