//! Named handlers ("controllers") and their invocation
//!
//! Controllers are registered by name in a [`ControllerRegistry`] together
//! with the methods they expose, so a route naming `Users::show` resolves
//! through a lookup table instead of any kind of reflection.

pub mod welcome;

use std::{collections::HashSet, fmt, sync::Arc};

use bytes::Bytes;

use crate::{
    core::{
        context::RequestContext,
        error::{DispatchError, DispatchResult},
        registry::ControllerRegistry,
    },
    http::{request::Request, response::Response},
};

/// Value returned by a handler
#[derive(Debug, Clone, Default)]
pub enum HandlerOutput {
    /// Nothing returned; only buffered output is used
    #[default]
    Empty,
    /// A body appended after buffered output
    Body(Bytes),
    /// A response that replaces the live one
    Response(Response),
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        HandlerOutput::Empty
    }
}

impl From<String> for HandlerOutput {
    fn from(body: String) -> Self {
        HandlerOutput::Body(Bytes::from(body))
    }
}

impl From<&'static str> for HandlerOutput {
    fn from(body: &'static str) -> Self {
        HandlerOutput::Body(Bytes::from_static(body.as_bytes()))
    }
}

impl From<Bytes> for HandlerOutput {
    fn from(body: Bytes) -> Self {
        HandlerOutput::Body(body)
    }
}

impl From<Response> for HandlerOutput {
    fn from(resp: Response) -> Self {
        HandlerOutput::Response(resp)
    }
}

/// A constructed handler instance, alive for one request
pub trait Controller: Send {
    /// Run `method` with the positional route parameters
    fn call(
        &mut self,
        method: &str,
        params: &[String],
        ctx: &mut RequestContext,
    ) -> DispatchResult<HandlerOutput>;

    /// Single entry point used instead of `call` when the descriptor declares
    /// remapping. Receives the requested method name and all parameters.
    fn remap(
        &mut self,
        method: &str,
        params: &[String],
        ctx: &mut RequestContext,
    ) -> DispatchResult<HandlerOutput> {
        self.call(method, params, ctx)
    }
}

/// Builds a controller for one request
pub type ControllerFactory =
    Arc<dyn Fn(&Request, &Response) -> DispatchResult<Box<dyn Controller>> + Send + Sync>;

/// Registration record for a named controller
pub struct ControllerDescriptor {
    name: String,
    factory: ControllerFactory,
    methods: HashSet<String>,
    remap: bool,
}

impl ControllerDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Request, &Response) -> DispatchResult<Box<dyn Controller>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            methods: HashSet::new(),
            remap: false,
        }
    }

    /// Declare a publicly callable method
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }

    pub fn methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods.extend(names.into_iter().map(Into::into));
        self
    }

    /// Route every call through [`Controller::remap`]
    pub fn with_remap(mut self) -> Self {
        self.remap = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn remaps(&self) -> bool {
        self.remap
    }

    /// Whether `method` may be invoked from a route
    pub fn accepts(&self, method: &str) -> bool {
        self.remap || self.methods.contains(method)
    }

    /// Construct a fresh instance. Failures are reported as
    /// [`DispatchError::HandlerConstruction`] and never retried.
    pub fn construct(
        &self,
        request: &Request,
        response: &Response,
    ) -> DispatchResult<Box<dyn Controller>> {
        (self.factory)(request, response).map_err(|e| match e {
            DispatchError::HandlerConstruction(_) => e,
            other => DispatchError::HandlerConstruction(format!("{}: {}", self.name, other)),
        })
    }
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&String> = self.methods.iter().collect();
        methods.sort();
        f.debug_struct("ControllerDescriptor")
            .field("name", &self.name)
            .field("methods", &methods)
            .field("remap", &self.remap)
            .finish()
    }
}

/// A named handler that failed validation; answered with the not-found path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub message: String,
}

impl NotFound {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Check that `controller::method` can be invoked, before anything is constructed
pub fn validate(
    registry: &ControllerRegistry,
    controller: &str,
    method: &str,
) -> Result<Arc<ControllerDescriptor>, NotFound> {
    if controller.is_empty() {
        return Err(NotFound::new("No controller specified.".to_string()));
    }

    let descriptor = registry
        .get(controller)
        .ok_or_else(|| NotFound::new(format!("Controller '{controller}' not found.")))?;

    if method.starts_with('_') {
        return Err(NotFound::new(format!(
            "Method '{controller}::{method}' is not publicly callable."
        )));
    }

    if !descriptor.accepts(method) {
        return Err(NotFound::new(format!(
            "Method '{controller}::{method}' not found."
        )));
    }

    Ok(descriptor)
}

/// Invoke an already constructed controller, honouring the remap preference
pub fn invoke(
    descriptor: &ControllerDescriptor,
    controller: &mut dyn Controller,
    method: &str,
    params: &[String],
    ctx: &mut RequestContext,
) -> DispatchResult<HandlerOutput> {
    if descriptor.remaps() {
        log::debug!("Remapping {}::{}", descriptor.name(), method);
        controller.remap(method, params, ctx)
    } else {
        controller.call(method, params, ctx)
    }
}
