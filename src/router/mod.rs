//! Route resolution types and the reference route table

pub mod table;

use std::{fmt, sync::Arc};

use crate::{
    core::{context::RequestContext, error::DispatchResult},
    handler::HandlerOutput,
};

pub use table::RouteTable;

/// A handler given inline: receives the positional route parameters
pub type HandlerFn =
    Arc<dyn Fn(&[String], &mut RequestContext) -> DispatchResult<HandlerOutput> + Send + Sync>;

/// What a matched route points at
#[derive(Clone)]
pub enum HandlerRef {
    Closure(HandlerFn),
    Named { controller: String, method: String },
}

impl HandlerRef {
    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&[String], &mut RequestContext) -> DispatchResult<HandlerOutput>
            + Send
            + Sync
            + 'static,
    {
        HandlerRef::Closure(Arc::new(f))
    }

    pub fn named(controller: impl Into<String>, method: impl Into<String>) -> Self {
        HandlerRef::Named {
            controller: controller.into(),
            method: method.into(),
        }
    }

    /// Parse the `Controller::method` notation used in configuration
    pub fn parse(spec: &str) -> Option<Self> {
        let (controller, method) = spec.split_once("::")?;
        let (controller, method) = (controller.trim(), method.trim());
        if controller.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self::named(controller, method))
    }

    pub fn is_closure(&self) -> bool {
        matches!(self, HandlerRef::Closure(_))
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Closure(_) => f.write_str("Closure"),
            HandlerRef::Named { controller, method } => write!(f, "{controller}::{method}"),
        }
    }
}

/// A successful route match
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub handler: HandlerRef,
    /// Captured parameters, in pattern order
    pub params: Vec<String>,
    /// Locale selected by the route, applied to the request before any filter runs
    pub locale: Option<String>,
}

/// Result of resolving a path
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Matched(RouteMatch),
    Redirect { target: String, code: u16 },
    NotFound { reason: String },
}
