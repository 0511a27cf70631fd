//! Before/after filter chains
//!
//! Filters are registered by name in [`FILTER_BUILDER_REGISTRY`] and built
//! from YAML configuration. A [`FilterChain`] binds each filter to the phases
//! and paths it applies to and runs the bindings in registration order.

pub mod echo;
pub mod request_id;
pub mod request_log;
pub mod secure_headers;

use std::{collections::HashMap, fmt, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::Validate;

use crate::{
    config::FilterConfig,
    config_error,
    core::{context::RequestContext, error::DispatchResult, traits::FilterRunner},
    http::{request::Request, response::Response},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => f.write_str("before"),
            Phase::After => f.write_str("after"),
        }
    }
}

/// A request filter. Both hooks default to doing nothing.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    /// Runs before the handler. A returned response is reported to the
    /// dispatcher; use [`RequestContext::halt`] to actually stop the request.
    fn before(
        &self,
        _request: &Request,
        _ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        Ok(None)
    }

    /// Runs after the handler. A returned response replaces the current one.
    fn after(
        &self,
        _request: &Request,
        _response: &Response,
        _ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        Ok(None)
    }
}

pub type FilterCreateFn = fn(YamlValue) -> DispatchResult<Arc<dyn Filter>>;

/// Global registry mapping filter names to their factory functions.
static FILTER_BUILDER_REGISTRY: Lazy<HashMap<&'static str, FilterCreateFn>> = Lazy::new(|| {
    let arr: Vec<(&str, FilterCreateFn)> = vec![
        (request_log::FILTER_NAME, request_log::create_request_log_filter),
        (request_id::FILTER_NAME, request_id::create_request_id_filter),
        (
            secure_headers::FILTER_NAME,
            secure_headers::create_secure_headers_filter,
        ),
        (echo::FILTER_NAME, echo::create_echo_filter),
    ];
    arr.into_iter().collect()
});

/// Creates a filter instance from configuration. Fails fast for unknown names.
pub fn build_filter(name: &str, cfg: YamlValue) -> DispatchResult<Arc<dyn Filter>> {
    let builder = FILTER_BUILDER_REGISTRY
        .get(name)
        .ok_or_else(|| config_error!("Unknown filter type '{}'", name))?;
    builder(cfg)
}

pub fn is_known_filter(name: &str) -> bool {
    FILTER_BUILDER_REGISTRY.contains_key(name)
}

/// Deserialize and validate a filter's `config` block. A missing block means defaults.
fn parse_filter_config<T>(name: &str, cfg: YamlValue) -> DispatchResult<T>
where
    T: serde::de::DeserializeOwned + Default + Validate,
{
    let config: T = if cfg.is_null() {
        T::default()
    } else {
        serde_yaml::from_value(cfg)
            .map_err(|e| config_error!("Invalid {} filter config: {}", name, e))?
    };
    config
        .validate()
        .map_err(|e| config_error!("Invalid {} filter config: {}", name, e))?;
    Ok(config)
}

fn compile_patterns(patterns: &[String]) -> DispatchResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{p})$"))
                .map_err(|e| config_error!("Invalid filter path pattern '{}': {}", p, e))
        })
        .collect()
}

/// A filter together with where and when it runs.
///
/// Path patterns are regular expressions anchored to the whole path. An empty
/// `uri` list matches every path; `except` patterns always win.
pub struct FilterBinding {
    filter: Arc<dyn Filter>,
    phases: Vec<Phase>,
    uri: Vec<Regex>,
    except: Vec<Regex>,
}

impl FilterBinding {
    pub fn new(filter: Arc<dyn Filter>, phases: &[Phase]) -> Self {
        Self {
            filter,
            phases: phases.to_vec(),
            uri: Vec::new(),
            except: Vec::new(),
        }
    }

    pub fn with_uri(mut self, patterns: &[String]) -> DispatchResult<Self> {
        self.uri = compile_patterns(patterns)?;
        Ok(self)
    }

    pub fn with_except(mut self, patterns: &[String]) -> DispatchResult<Self> {
        self.except = compile_patterns(patterns)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        self.filter.name()
    }

    pub fn applies(&self, path: &str, phase: Phase) -> bool {
        self.phases.contains(&phase)
            && (self.uri.is_empty() || self.uri.iter().any(|re| re.is_match(path)))
            && !self.except.iter().any(|re| re.is_match(path))
    }
}

#[derive(Default)]
pub struct FilterChain {
    bindings: Vec<FilterBinding>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(filters: &[FilterConfig]) -> DispatchResult<Self> {
        let mut chain = Self::new();
        for cfg in filters {
            let filter = build_filter(&cfg.name, cfg.config.clone())?;
            chain.push(
                FilterBinding::new(filter, &cfg.phases)
                    .with_uri(&cfg.uri)?
                    .with_except(&cfg.except)?,
            );
        }
        log::debug!("Built filter chain with {} filters", chain.len());
        Ok(chain)
    }

    pub fn push(&mut self, binding: FilterBinding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn run_before(
        &self,
        path: &str,
        request: &Request,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let mut reported = None;
        for binding in self.bindings.iter().filter(|b| b.applies(path, Phase::Before)) {
            log::debug!("Running before filter {} for {}", binding.name(), path);
            if let Some(resp) = binding.filter.before(request, ctx)? {
                reported = Some(resp);
            }
            if ctx.is_halted() {
                log::debug!("Request halted by filter {}", binding.name());
                break;
            }
        }
        Ok(reported)
    }

    fn run_after(
        &self,
        path: &str,
        request: &Request,
        response: &Response,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let mut replaced: Option<Response> = None;
        for binding in self.bindings.iter().filter(|b| b.applies(path, Phase::After)) {
            log::debug!("Running after filter {} for {}", binding.name(), path);
            let current = replaced.as_ref().unwrap_or(response);
            if let Some(resp) = binding.filter.after(request, current, ctx)? {
                replaced = Some(resp);
            }
        }
        Ok(replaced)
    }
}

impl FilterRunner for FilterChain {
    fn run(
        &self,
        path: &str,
        phase: Phase,
        request: &Request,
        response: &Response,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        match phase {
            Phase::Before => self.run_before(path, request, ctx),
            Phase::After => self.run_after(path, request, response, ctx),
        }
    }
}
