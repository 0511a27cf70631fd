//! Core traits for ignition components
//!
//! These are the seams between the dispatcher and its collaborators. The
//! crate ships one implementation of each, and hosts may swap in their own.

use bytes::Bytes;

use super::{context::RequestContext, error::DispatchResult};
use crate::{
    filter::Phase,
    http::{request::Request, response::Response},
    router::{HandlerRef, RouteOutcome},
};

/// Trait for route matching and resolution
pub trait RouteResolver: Send + Sync {
    /// Resolve a request path into a handler, a redirect or a miss
    fn resolve(&self, path: &str) -> RouteOutcome;

    /// Handler to run instead of the built-in "not found" page
    fn not_found_override(&self) -> Option<HandlerRef>;
}

/// Trait for running the filter chain of one phase
pub trait FilterRunner: Send + Sync {
    /// Run every filter bound to `path` for `phase`. The returned response,
    /// if any, is the one reported by the chain.
    fn run(
        &self,
        path: &str,
        phase: Phase,
        request: &Request,
        response: &Response,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>>;
}

/// Trait for full-page cache storage
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Store `value` for `ttl` seconds. Returns `false` when nothing was stored.
    fn set(&self, key: &str, value: Bytes, ttl: u64) -> bool;

    fn delete(&self, key: &str) -> bool;
}

/// Trait for the session collaborator
pub trait SessionStore: Send + Sync {
    /// Store a value when a session is active. Returns `false` otherwise.
    fn set_if_available(&self, key: &str, value: &str) -> bool;

    fn get(&self, key: &str) -> Option<String>;
}

/// Trait for delivering a finished response
pub trait ResponseEmitter: Send + Sync {
    fn emit(&self, request: &Request, response: &Response) -> DispatchResult<()>;
}
