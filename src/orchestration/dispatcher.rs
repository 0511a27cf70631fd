//! Per-request lifecycle
//!
//! A [`Dispatcher`] owns one request from arrival to the moment its response
//! is handed to the emitter:
//!
//! 1. benchmark and response preparation
//! 2. transport security (HTTPS redirect + HSTS)
//! 3. full-page cache lookup
//! 4. routing, which may short-circuit into a redirect or the not-found path
//! 5. before filters, handler invocation, output gathering, page caching
//! 6. after filters, previous-URL tracking, send, `post_system` hook

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use bytes::{Bytes, BytesMut};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::bytes::{NoExpand, Regex};

use crate::{
    cache::{cache_key, CacheEnvelope},
    core::{
        container::ServiceContainer,
        context::RequestContext,
        error::DispatchResult,
        status::ExitStatus,
        timer::{format_seconds, phase, Timer},
        traits::RouteResolver,
    },
    filter::Phase,
    handler::{self, HandlerOutput, NotFound},
    hooks::HookPoint,
    http::{request::Request, response::Response},
    router::{HandlerRef, RouteMatch, RouteOutcome},
    session::PREVIOUS_URL_KEY,
};

static ELAPSED_TIME_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{elapsed_time\}").expect("Invalid regex pattern for elapsed time tag"));

/// Timing and memory snapshot of one request
#[derive(Debug, Clone)]
pub struct PerformanceStats {
    /// Wall-clock time the request started
    pub start_time: SystemTime,
    /// Total execution time, once measured
    pub total_elapsed: Option<Duration>,
    /// Resident memory at start, when the platform reports it
    pub start_memory: Option<usize>,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self {
            start_time: SystemTime::now(),
            total_elapsed: None,
            start_memory: None,
        }
    }
}

pub struct Dispatcher {
    pub(super) container: Arc<ServiceContainer>,
    pub(super) request: Request,
    pub(super) response: Response,
    pub(super) ctx: RequestContext,
    timer: Timer,
    stats: PerformanceStats,
    path: Option<String>,
}

impl Dispatcher {
    pub fn new(container: Arc<ServiceContainer>, request: Request) -> Self {
        Self {
            container,
            request,
            response: Response::new(),
            ctx: RequestContext::new(),
            timer: Timer::new(),
            stats: PerformanceStats::default(),
            path: None,
        }
    }

    /// Route this path instead of the one the request arrived with.
    /// Filters and the page cache still use the transport path.
    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    pub fn performance_stats(&self) -> &PerformanceStats {
        &self.stats
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Serve the request. `routes` overrides the container's route table.
    ///
    /// Always ends by sending a response and returning the process exit
    /// status, unless an error escapes to the caller.
    pub fn run(&mut self, routes: Option<Arc<dyn RouteResolver>>) -> DispatchResult<ExitStatus> {
        self.start_benchmark();
        self.prepare_response();

        if self.force_secure_access()? {
            return Ok(ExitStatus::Success);
        }

        if self.display_cache()? {
            return Ok(ExitStatus::Success);
        }

        let routes = routes.unwrap_or_else(|| self.container.routes());
        let route = match self.try_to_route_it(routes.as_ref()) {
            RouteOutcome::Matched(route) => route,
            RouteOutcome::Redirect { target, code } => {
                info!("Redirecting {} to {} ({})", self.request.path(), target, code);
                self.response.redirect(&target, code);
                self.send_response()?;
                return Ok(ExitStatus::Success);
            }
            RouteOutcome::NotFound { reason } => {
                return self.display_404(routes.as_ref(), &reason);
            }
        };

        let filter_path = self.request.path();
        if self.run_before_filters(&filter_path)? {
            return Ok(ExitStatus::Success);
        }

        let returned = match self.start_controller(&route)? {
            Ok(returned) => returned,
            Err(not_found) => return self.display_404(routes.as_ref(), &not_found.message),
        };

        self.gather_output(returned, true);

        if let Some(replaced) = self.container.filters().run(
            &filter_path,
            Phase::After,
            &self.request,
            &self.response,
            &mut self.ctx,
        )? {
            self.response = replaced;
        }

        self.store_previous_url();
        self.send_response()?;
        self.container.hooks().trigger(HookPoint::PostSystem);

        Ok(ExitStatus::Success)
    }

    fn start_benchmark(&mut self) {
        let start = self.ctx.request_start().unwrap_or_else(std::time::Instant::now);
        self.timer.start_at(phase::TOTAL_EXECUTION, start);
        self.timer.start(phase::BOOTSTRAP);

        self.stats = PerformanceStats {
            start_time: SystemTime::now(),
            total_elapsed: None,
            start_memory: memory_stats::memory_stats().map(|m| m.physical_mem),
        };
    }

    fn prepare_response(&mut self) {
        if let Some(version) = self.request.version() {
            self.response.set_version(version);
        }
        self.response.set_status(http::StatusCode::OK);
    }

    /// Redirect plain HTTP to HTTPS when configured. Returns `true` when the
    /// redirect was sent.
    fn force_secure_access(&mut self) -> DispatchResult<bool> {
        let app = &self.container.config().app;
        if !app.force_global_secure_requests || self.request.is_secure() {
            return Ok(false);
        }
        let Some(incoming) = self.request.as_incoming() else {
            return Ok(false);
        };

        let fallback = app
            .base_url
            .as_deref()
            .and_then(|url| url.parse::<http::Uri>().ok())
            .and_then(|uri| uri.authority().map(|a| a.to_string()));
        let target = incoming.https_url(fallback.as_deref());
        let hsts = format!("max-age={}", app.hsts_max_age);

        info!("Forcing secure access: redirecting to {target}");
        self.response.redirect(&target, 302);
        self.response.set_header("Strict-Transport-Security", hsts);
        self.send_response()?;
        Ok(true)
    }

    /// Serve the page from cache when an entry exists. Returns `true` when
    /// the cached page was sent.
    pub fn display_cache(&mut self) -> DispatchResult<bool> {
        let key = cache_key(&self.request, &self.container.config().cache);
        let Some(raw) = self.container.cache().get(&key) else {
            return Ok(false);
        };

        let envelope = CacheEnvelope::decode(&raw)?;
        debug!("Serving {} from page cache", self.request.path());

        self.response.clear_headers();
        for (name, value) in envelope.headers {
            self.response.set_header(name, value);
        }
        let body = self.display_performance_metrics(&envelope.body);
        self.response.set_body(body);

        self.send_response()?;
        Ok(true)
    }

    /// Store the current headers and `output` under this request's key.
    /// A failed write only means the page is not cached.
    pub fn cache_page(&self, output: Bytes) -> bool {
        let ttl = self.ctx.cache_ttl();
        if ttl <= 0 {
            return false;
        }

        let key = cache_key(&self.request, &self.container.config().cache);
        let encoded = match CacheEnvelope::capture(&self.response, output).encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Page not cached: {e}");
                return false;
            }
        };

        let stored = self.container.cache().set(&key, encoded, ttl as u64);
        if !stored {
            warn!("Page cache refused entry for {}", self.request.path());
        }
        stored
    }

    fn try_to_route_it(&mut self, routes: &dyn RouteResolver) -> RouteOutcome {
        self.timer.stop(phase::BOOTSTRAP);
        self.timer.start(phase::ROUTING);

        let path = self.path.clone().unwrap_or_else(|| self.request.path());
        let outcome = routes.resolve(&path);

        if let RouteOutcome::Matched(RouteMatch {
            locale: Some(locale),
            ..
        }) = &outcome
        {
            self.request.set_locale(locale.clone());
        }

        self.timer.stop(phase::ROUTING);
        debug!("Routed {} to {:?}", path, outcome);
        outcome
    }

    /// Returns `true` when a filter halted the request and its response was sent
    fn run_before_filters(&mut self, path: &str) -> DispatchResult<bool> {
        let reported = self.container.filters().run(
            path,
            Phase::Before,
            &self.request,
            &self.response,
            &mut self.ctx,
        )?;

        if let Some(halt) = self.ctx.take_halt() {
            self.response = halt;
            self.send_response()?;
            return Ok(true);
        }

        if reported.is_some() {
            debug!("Discarding response returned by before filters for {path}");
        }
        Ok(false)
    }

    /// Run the matched handler. The inner `Err` is a validation failure that
    /// must be answered with the not-found path.
    fn start_controller(
        &mut self,
        route: &RouteMatch,
    ) -> DispatchResult<Result<HandlerOutput, NotFound>> {
        self.ctx.route_params = route.params.clone();

        match &route.handler {
            HandlerRef::Closure(handler) => {
                self.timer.start(phase::CONTROLLER);
                self.timer.start(phase::CONTROLLER_CONSTRUCTOR);
                let output = handler(&route.params, &mut self.ctx)?;
                self.timer.stop(phase::CONTROLLER_CONSTRUCTOR);
                self.timer.stop(phase::CONTROLLER);
                Ok(Ok(output))
            }
            HandlerRef::Named { controller, method } => {
                self.run_named(controller, method, &route.params)
            }
        }
    }

    pub(super) fn run_named(
        &mut self,
        controller: &str,
        method: &str,
        params: &[String],
    ) -> DispatchResult<Result<HandlerOutput, NotFound>> {
        let descriptor = match handler::validate(self.container.controllers(), controller, method)
        {
            Ok(descriptor) => descriptor,
            Err(not_found) => return Ok(Err(not_found)),
        };

        self.timer.start(phase::CONTROLLER);
        self.timer.start(phase::CONTROLLER_CONSTRUCTOR);
        let mut instance = descriptor.construct(&self.request, &self.response)?;
        self.timer.stop(phase::CONTROLLER_CONSTRUCTOR);

        self.container
            .hooks()
            .trigger(HookPoint::PostControllerConstructor);

        let output = handler::invoke(
            &descriptor,
            instance.as_mut(),
            method,
            params,
            &mut self.ctx,
        )?;
        self.timer.stop(phase::CONTROLLER);

        Ok(Ok(output))
    }

    /// Combine buffered output with the handler's return value and set the
    /// response body. Caches the page first when `cacheable` and a TTL is set.
    pub(super) fn gather_output(&mut self, returned: HandlerOutput, cacheable: bool) {
        let mut output = BytesMut::from(self.ctx.output.take().as_ref());

        match returned {
            HandlerOutput::Empty => {}
            HandlerOutput::Body(body) => output.extend_from_slice(&body),
            HandlerOutput::Response(response) => {
                self.response = response;
                output.extend_from_slice(self.response.body());
            }
        }

        let output = output.freeze();
        if cacheable {
            self.cache_page(output.clone());
        }

        let body = self.display_performance_metrics(&output);
        self.response.set_body(body);
    }

    /// Replace `{elapsed_time}` with the total execution time so far
    fn display_performance_metrics(&mut self, output: &[u8]) -> Bytes {
        let elapsed = self
            .timer
            .elapsed(phase::TOTAL_EXECUTION)
            .unwrap_or_default();
        self.stats.total_elapsed = Some(elapsed);

        let formatted = format_seconds(elapsed);
        Bytes::from(
            ELAPSED_TIME_TAG
                .replace_all(output, NoExpand(formatted.as_bytes()))
                .into_owned(),
        )
    }

    /// Remember this URL in the session; the store decides whether one is available
    fn store_previous_url(&self) {
        let uri = self.request.uri_string();
        if self
            .container
            .session()
            .set_if_available(PREVIOUS_URL_KEY, &uri)
        {
            debug!("Stored previous URL {uri}");
        }
    }

    pub(super) fn send_response(&self) -> DispatchResult<()> {
        self.container.emitter().emit(&self.request, &self.response)
    }
}
