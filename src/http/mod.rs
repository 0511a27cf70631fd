//! Transport-neutral request and response types

pub mod emitter;
pub mod request;
pub mod response;

pub use emitter::{BufferedEmitter, StdoutEmitter};
pub use request::{CliRequest, IncomingRequest, Request};
pub use response::Response;
