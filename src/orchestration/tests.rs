//! Scenario tests for the request lifecycle

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use bytes::Bytes;
use http::StatusCode;
use regex::Regex;

use super::Dispatcher;
use crate::{
    cache::{cache_key, CacheEnvelope, MemoryCache},
    config::Config,
    core::{
        context::RequestContext,
        error::{DispatchError, DispatchResult},
        status::ExitStatus,
        timer::phase,
        traits::{CacheStore, SessionStore},
        ServiceContainer,
    },
    filter::{build_filter, Filter, FilterBinding, FilterChain, Phase},
    handler::{Controller, ControllerDescriptor, HandlerOutput},
    hooks::HookPoint,
    http::{
        emitter::BufferedEmitter,
        request::{CliRequest, Request},
        response::Response,
    },
    router::{HandlerRef, RouteTable},
    session::{MemorySession, PREVIOUS_URL_KEY},
};

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn get(uri: &str) -> Request {
    Request::from(
        http::Request::builder()
            .uri(uri)
            .header("host", "example.com")
            .body(Bytes::new())
            .unwrap(),
    )
}

fn body_str(response: &Response) -> String {
    String::from_utf8(response.body().to_vec()).unwrap()
}

/// Records what the filter chain saw
#[derive(Default)]
struct Recorder {
    before: AtomicUsize,
    after: AtomicUsize,
    locale: Mutex<Option<String>>,
}

struct RecordingFilter(Arc<Recorder>);

impl Filter for RecordingFilter {
    fn name(&self) -> &str {
        "recorder"
    }

    fn before(
        &self,
        request: &Request,
        _ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        self.0.before.fetch_add(1, Ordering::SeqCst);
        *self.0.locale.lock().unwrap() = request.locale().map(str::to_string);
        // Returned before-filter responses are ignored by the dispatcher
        Ok(Some(Response::text(StatusCode::IM_A_TEAPOT, "from before")))
    }

    fn after(
        &self,
        _request: &Request,
        _response: &Response,
        _ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        self.0.after.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

fn recording_chain(seen: &Arc<Recorder>) -> FilterChain {
    let mut chain = FilterChain::new();
    chain.push(FilterBinding::new(
        Arc::new(RecordingFilter(seen.clone())),
        &[Phase::Before, Phase::After],
    ));
    chain
}

struct Users {
    calls: Arc<AtomicUsize>,
}

impl Controller for Users {
    fn call(
        &mut self,
        method: &str,
        params: &[String],
        ctx: &mut RequestContext,
    ) -> DispatchResult<HandlerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            "show" => {
                ctx.echo("User ");
                Ok(format!("{} rendered in {{elapsed_time}}s", params.join(",")).into())
            }
            "created" => {
                ctx.echo("buffered:");
                let mut resp = Response::text(StatusCode::CREATED, "returned");
                resp.set_header("X-Created", "yes");
                Ok(resp.into())
            }
            "missing" => Ok(Response::text(StatusCode::NOT_FOUND, "custom missing page").into()),
            _ => Err(DispatchError::Handler(format!("unexpected method {method}"))),
        }
    }

    fn remap(
        &mut self,
        method: &str,
        params: &[String],
        _ctx: &mut RequestContext,
    ) -> DispatchResult<HandlerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("remapped {method}({})", params.join(",")).into())
    }
}

fn users(calls: &Arc<AtomicUsize>) -> ControllerDescriptor {
    let calls = calls.clone();
    ControllerDescriptor::new("Users", move |_, _| {
        Ok(Box::new(Users {
            calls: calls.clone(),
        }) as Box<dyn Controller>)
    })
    .methods(["show", "created", "missing", "_internal"])
}

struct Harness {
    container: Arc<ServiceContainer>,
    emitter: Arc<BufferedEmitter>,
    cache: Arc<MemoryCache>,
    session: Arc<MemorySession>,
}

impl Harness {
    fn new(
        config: Config,
        routes: RouteTable,
        filters: FilterChain,
        controllers: Vec<ControllerDescriptor>,
    ) -> Self {
        init_log();
        let emitter = Arc::new(BufferedEmitter::new());
        let cache = Arc::new(MemoryCache::new());
        let session = Arc::new(MemorySession::new());

        let mut builder = ServiceContainer::builder()
            .config(config)
            .routes(Arc::new(routes))
            .filters(Arc::new(filters))
            .emitter(emitter.clone())
            .cache(cache.clone())
            .session(session.clone());
        for descriptor in controllers {
            builder = builder.controller(descriptor);
        }

        Self {
            container: Arc::new(builder.build()),
            emitter,
            cache,
            session,
        }
    }

    fn dispatcher(&self, request: Request) -> Dispatcher {
        Dispatcher::new(self.container.clone(), request)
    }

    /// Run a request and return its exit status plus the one response it emitted
    fn run(&self, request: Request) -> (ExitStatus, Response) {
        let mut dispatcher = self.dispatcher(request);
        let status = dispatcher.run(None).unwrap();
        let mut emitted = self.emitter.take();
        assert_eq!(emitted.len(), 1, "exactly one response must be sent");
        (status, emitted.remove(0))
    }
}

#[test]
fn test_users_42_end_to_end() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes
        .add("/users/{id}", HandlerRef::named("Users", "show"))
        .unwrap();

    let mut filters = FilterChain::new();
    filters.push(FilterBinding::new(
        build_filter("request-id", serde_yaml::Value::Null).unwrap(),
        &[Phase::Before, Phase::After],
    ));

    let harness = Harness::new(Config::default(), routes, filters, vec![users(&calls)]);

    let constructed = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let c = constructed.clone();
    harness
        .container
        .hooks()
        .on(HookPoint::PostControllerConstructor, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
    let f = finished.clone();
    harness.container.hooks().on(HookPoint::PostSystem, move || {
        f.fetch_add(1, Ordering::SeqCst);
    });

    let mut dispatcher = harness.dispatcher(get("/users/42"));
    let status = dispatcher.run(None).unwrap();
    assert_eq!(status, ExitStatus::Success);

    let sent = harness.emitter.last().unwrap();
    assert_eq!(sent.status(), StatusCode::OK);
    let body = body_str(&sent);
    assert!(body.starts_with("User 42 rendered in "), "{body}");
    assert!(!body.contains("{elapsed_time}"));
    assert!(sent.has_header("X-Request-Id"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    assert_eq!(
        harness.session.get(PREVIOUS_URL_KEY).as_deref(),
        Some("http://example.com/users/42")
    );

    let timer = dispatcher.timer();
    for name in [
        phase::TOTAL_EXECUTION,
        phase::BOOTSTRAP,
        phase::ROUTING,
        phase::CONTROLLER,
        phase::CONTROLLER_CONSTRUCTOR,
    ] {
        assert!(timer.has(name), "missing timer {name}");
    }
    assert!(!timer.is_running(phase::CONTROLLER));
    assert!(dispatcher.performance_stats().total_elapsed.is_some());
}

#[test]
fn test_redirect_skips_filters_and_handlers() {
    let seen = Arc::new(Recorder::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes.add_redirect("/old", "/users/1", 301).unwrap();

    let harness = Harness::new(
        Config::default(),
        routes,
        recording_chain(&seen),
        vec![users(&calls)],
    );
    let (status, sent) = harness.run(get("/old"));

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(sent.header("Location"), Some("/users/1"));
    assert_eq!(seen.before.load(Ordering::SeqCst), 0);
    assert_eq!(seen.after.load(Ordering::SeqCst), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cached_headers_replayed_exactly() {
    let seen = Arc::new(Recorder::default());
    let config = Config::default();
    let request = get("/report");
    let key = cache_key(&request, &config.cache);

    let envelope = CacheEnvelope {
        headers: vec![
            ("Content-Type".to_string(), "text/csv".to_string()),
            ("X-Cached".to_string(), "1".to_string()),
        ],
        body: Bytes::from_static(b"cached in {elapsed_time}"),
    };

    // No route exists: a hit must not depend on routing at all
    let harness = Harness::new(config, RouteTable::new(), recording_chain(&seen), vec![]);
    assert!(harness.cache.set(&key, envelope.encode().unwrap(), 60));

    let (status, sent) = harness.run(request);
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(
        sent.headers(),
        &[
            ("Content-Type".to_string(), "text/csv".to_string()),
            ("X-Cached".to_string(), "1".to_string()),
        ]
    );
    let body = body_str(&sent);
    assert!(body.starts_with("cached in 0."), "{body}");
    assert_eq!(seen.before.load(Ordering::SeqCst), 0);
}

fn cached_list_harness(config: Config, calls: &Arc<AtomicUsize>) -> Harness {
    let calls = calls.clone();
    let mut routes = RouteTable::new();
    routes
        .add(
            "/list",
            HandlerRef::closure(move |_, ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                ctx.cache_for(300);
                let mut resp = Response::text(StatusCode::OK, "list page");
                resp.set_header("X-Page", "list");
                Ok(resp.into())
            }),
        )
        .unwrap();
    Harness::new(config, routes, FilterChain::new(), vec![])
}

#[test]
fn test_warm_cache_is_idempotent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let harness = cached_list_harness(Config::default(), &calls);

    let (_, first) = harness.run(get("/list"));
    let (_, second) = harness.run(get("/list"));
    let (_, third) = harness.run(get("/list"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.body(), second.body());
    assert_eq!(second, third);
    assert_eq!(second.header("X-Page"), Some("list"));
    assert_eq!(harness.cache.len(), 1);
}

#[test]
fn test_cache_key_ignores_query_string_by_default() {
    let calls = Arc::new(AtomicUsize::new(0));
    let harness = cached_list_harness(Config::default(), &calls);
    harness.run(get("/list?page=1"));
    harness.run(get("/list?page=2"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = Config::default();
    config.cache.cache_query_string = true;
    let harness = cached_list_harness(config, &calls);
    harness.run(get("/list?page=1"));
    harness.run(get("/list?page=2"));
    harness.run(get("/list?page=1"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_corrupt_cache_entry_is_fatal() {
    let config = Config::default();
    let request = get("/broken");
    let key = cache_key(&request, &config.cache);

    let harness = Harness::new(config, RouteTable::new(), FilterChain::new(), vec![]);
    harness
        .cache
        .set(&key, Bytes::from_static(b"{\"headers\": 5}"), 60);

    let err = harness.dispatcher(request).run(None).unwrap_err();
    assert!(matches!(err, DispatchError::CacheCorrupt(_)));
    assert_eq!(harness.emitter.count(), 0);
}

#[test]
fn test_not_found_without_override() {
    let seen = Arc::new(Recorder::default());
    let harness = Harness::new(
        Config::default(),
        RouteTable::new(),
        recording_chain(&seen),
        vec![],
    );

    let (status, sent) = harness.run(get("/nowhere"));
    assert_eq!(status, ExitStatus::UnknownFile);
    assert_eq!(status.code(), 4);
    assert_eq!(sent.status(), StatusCode::NOT_FOUND);
    assert!(sent.header("Content-Type").unwrap().starts_with("text/html"));
    let body = body_str(&sent);
    assert!(body.contains("Page Not Found"));
    assert!(body.contains("/nowhere"));
    assert_eq!(seen.before.load(Ordering::SeqCst), 0);

    let (status, sent) = harness.run(Request::from(CliRequest::from_args(["nope"])));
    assert_eq!(status, ExitStatus::UnknownFile);
    assert!(body_str(&sent).starts_with("\nERROR: Page Not Found"));
}

#[test]
fn test_not_found_with_closure_override() {
    let mut routes = RouteTable::new();
    routes.set_404_override(HandlerRef::closure(|params, ctx| {
        assert!(params.is_empty());
        ctx.cache_for(60);
        Ok("Nothing here".into())
    }));
    let harness = Harness::new(Config::default(), routes, FilterChain::new(), vec![]);

    let (status, sent) = harness.run(get("/nowhere"));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.status(), StatusCode::OK);
    assert_eq!(sent.body().as_ref(), b"Nothing here");
    // The override path never populates the page cache
    assert!(harness.cache.is_empty());
}

#[test]
fn test_not_found_with_named_override() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes.set_404_override(HandlerRef::named("Users", "missing"));
    let harness = Harness::new(
        Config::default(),
        routes,
        FilterChain::new(),
        vec![users(&calls)],
    );

    let (status, sent) = harness.run(get("/nowhere"));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.status(), StatusCode::NOT_FOUND);
    assert_eq!(sent.body().as_ref(), b"custom missing page");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_validation_failure_goes_to_not_found() {
    let seen = Arc::new(Recorder::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes
        .add("/secret", HandlerRef::named("Users", "_internal"))
        .unwrap();
    routes
        .add("/ghost", HandlerRef::named("Ghost", "index"))
        .unwrap();
    let harness = Harness::new(
        Config::default(),
        routes,
        recording_chain(&seen),
        vec![users(&calls)],
    );

    let (status, sent) = harness.run(get("/secret"));
    assert_eq!(status, ExitStatus::UnknownFile);
    assert!(body_str(&sent).contains("not publicly callable"));

    let (status, sent) = harness.run(get("/ghost"));
    assert_eq!(status, ExitStatus::UnknownFile);
    assert!(body_str(&sent).contains("Controller &#39;Ghost&#39; not found."));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(seen.before.load(Ordering::SeqCst), 2);
    assert_eq!(seen.after.load(Ordering::SeqCst), 0);
}

#[test]
fn test_remap_takes_precedence_over_declared_methods() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes
        .add("/users/{id}", HandlerRef::named("Users", "show"))
        .unwrap();
    let harness = Harness::new(
        Config::default(),
        routes,
        FilterChain::new(),
        vec![users(&calls).with_remap()],
    );

    let (_, sent) = harness.run(get("/users/7"));
    assert_eq!(sent.body().as_ref(), b"remapped show(7)");
}

#[test]
fn test_returned_response_replaces_live_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes
        .add("/users", HandlerRef::named("Users", "created"))
        .unwrap();
    let harness = Harness::new(
        Config::default(),
        routes,
        FilterChain::new(),
        vec![users(&calls)],
    );

    let (_, sent) = harness.run(get("/users"));
    assert_eq!(sent.status(), StatusCode::CREATED);
    assert_eq!(sent.header("X-Created"), Some("yes"));
    assert_eq!(sent.body().as_ref(), b"buffered:returned");
}

#[test]
fn test_before_filter_response_is_discarded() {
    let seen = Arc::new(Recorder::default());
    let mut routes = RouteTable::new();
    routes
        .add("/", HandlerRef::closure(|_, _| Ok("home".into())))
        .unwrap();
    let harness = Harness::new(Config::default(), routes, recording_chain(&seen), vec![]);

    let (_, sent) = harness.run(get("/"));
    assert_eq!(sent.status(), StatusCode::OK);
    assert_eq!(sent.body().as_ref(), b"home");
    assert_eq!(seen.before.load(Ordering::SeqCst), 1);
    assert_eq!(seen.after.load(Ordering::SeqCst), 1);
}

#[test]
fn test_before_filter_halt_sends_its_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut routes = RouteTable::new();
    routes
        .add("/users/{id}", HandlerRef::named("Users", "show"))
        .unwrap();

    let echo_cfg: serde_yaml::Value =
        serde_yaml::from_str("body: down for maintenance\nstatus: 503").unwrap();
    let mut filters = FilterChain::new();
    filters.push(FilterBinding::new(
        build_filter("echo", echo_cfg).unwrap(),
        &[Phase::Before],
    ));
    let harness = Harness::new(Config::default(), routes, filters, vec![users(&calls)]);

    let (status, sent) = harness.run(get("/users/1"));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(sent.body().as_ref(), b"down for maintenance");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_after_filter_replaces_response() {
    let mut routes = RouteTable::new();
    routes
        .add("/", HandlerRef::closure(|_, _| Ok("home".into())))
        .unwrap();
    let mut filters = FilterChain::new();
    filters.push(FilterBinding::new(
        build_filter("secure-headers", serde_yaml::Value::Null).unwrap(),
        &[Phase::After],
    ));
    let harness = Harness::new(Config::default(), routes, filters, vec![]);

    let (_, sent) = harness.run(get("/"));
    assert_eq!(sent.header("X-Frame-Options"), Some("SAMEORIGIN"));
    assert_eq!(sent.body().as_ref(), b"home");
}

#[test]
fn test_locale_applied_before_filters() {
    let seen = Arc::new(Recorder::default());
    let mut routes =
        RouteTable::new().with_locales("en".to_string(), vec!["en".into(), "fr".into()]);
    routes
        .add("/{locale}/about", HandlerRef::closure(|_, _| Ok("about".into())))
        .unwrap();
    let harness = Harness::new(Config::default(), routes, recording_chain(&seen), vec![]);

    let mut dispatcher = harness.dispatcher(get("/fr/about"));
    dispatcher.run(None).unwrap();
    assert_eq!(seen.locale.lock().unwrap().as_deref(), Some("fr"));
    assert_eq!(dispatcher.request().locale(), Some("fr"));
}

#[test]
fn test_path_override_routes_but_filters_use_transport_path() {
    let seen = Arc::new(Recorder::default());
    let mut routes = RouteTable::new();
    routes
        .add("/internal", HandlerRef::closure(|_, _| Ok("internal".into())))
        .unwrap();

    let mut filters = FilterChain::new();
    filters.push(
        FilterBinding::new(
            Arc::new(RecordingFilter(seen.clone())),
            &[Phase::Before, Phase::After],
        )
        .with_uri(&["/public".to_string()])
        .unwrap(),
    );
    let harness = Harness::new(Config::default(), routes, filters, vec![]);

    let mut dispatcher = harness.dispatcher(get("/public"));
    dispatcher.set_path("/internal");
    let status = dispatcher.run(None).unwrap();

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(dispatcher.response().body().as_ref(), b"internal");
    assert_eq!(seen.before.load(Ordering::SeqCst), 1);
    assert_eq!(seen.after.load(Ordering::SeqCst), 1);
}

#[test]
fn test_explicit_routes_override_container_routes() {
    let harness = Harness::new(Config::default(), RouteTable::new(), FilterChain::new(), vec![]);

    let mut explicit = RouteTable::new();
    explicit
        .add("/only-here", HandlerRef::closure(|_, _| Ok("explicit".into())))
        .unwrap();

    let mut dispatcher = harness.dispatcher(get("/only-here"));
    let status = dispatcher.run(Some(Arc::new(explicit))).unwrap();
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(harness.emitter.last().unwrap().body().as_ref(), b"explicit");
}

#[test]
fn test_force_secure_redirects_plain_http() {
    let mut config = Config::default();
    config.app.force_global_secure_requests = true;
    let mut routes = RouteTable::new();
    routes
        .add("/", HandlerRef::closure(|_, _| Ok("home".into())))
        .unwrap();
    let harness = Harness::new(config, routes, FilterChain::new(), vec![]);

    let (status, sent) = harness.run(get("/?a=1"));
    assert_eq!(status, ExitStatus::Success);
    assert!(sent.status().is_redirection());
    assert_eq!(sent.header("Location"), Some("https://example.com/?a=1"));
    assert_eq!(
        sent.header("Strict-Transport-Security"),
        Some("max-age=31536000")
    );

    // CLI requests are exempt
    let (status, sent) = harness.run(Request::from(CliRequest::default()));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.body().as_ref(), b"home");

    let (_, sent) = harness.run(get("https://example.com/"));
    assert_eq!(sent.body().as_ref(), b"home");
}

#[test]
fn test_construction_failure_propagates() {
    let mut routes = RouteTable::new();
    routes
        .add("/broken", HandlerRef::named("Broken", "index"))
        .unwrap();
    let broken = ControllerDescriptor::new("Broken", |_, _| {
        Err(DispatchError::HandlerConstruction("no database".to_string()))
    })
    .method("index");
    let harness = Harness::new(Config::default(), routes, FilterChain::new(), vec![broken]);

    let err = harness.dispatcher(get("/broken")).run(None).unwrap_err();
    assert!(matches!(err, DispatchError::HandlerConstruction(_)));
    assert_eq!(harness.emitter.count(), 0);
}

#[test]
fn test_inactive_session_is_not_written() {
    init_log();
    let session = Arc::new(MemorySession::inactive());
    let emitter = Arc::new(BufferedEmitter::new());
    let mut routes = RouteTable::new();
    routes
        .add("/", HandlerRef::closure(|_, _| Ok("home".into())))
        .unwrap();
    let container = Arc::new(
        ServiceContainer::builder()
            .routes(Arc::new(routes))
            .session(session.clone())
            .emitter(emitter.clone())
            .build(),
    );

    let status = Dispatcher::new(container, get("/")).run(None).unwrap();
    assert_eq!(status, ExitStatus::Success);
    assert!(session.get(PREVIOUS_URL_KEY).is_none());
    assert_eq!(emitter.count(), 1);
}

/// Filter with no behaviour of its own
struct Passthrough;

impl Filter for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }
}

#[test]
fn test_users_42_returns_exact_body() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/users/{id}",
            HandlerRef::closure(|params, _| Ok(format!("ok:{}", params[0]).into())),
        )
        .unwrap();

    let mut filters = FilterChain::new();
    filters.push(FilterBinding::new(
        build_filter("request-log", serde_yaml::Value::Null).unwrap(),
        &[Phase::Before],
    ));
    filters.push(FilterBinding::new(Arc::new(Passthrough), &[Phase::After]));
    let harness = Harness::new(Config::default(), routes, filters, vec![]);

    let (status, sent) = harness.run(get("/users/42"));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.status(), StatusCode::OK);
    assert_eq!(sent.body().as_ref(), b"ok:42");
}

#[test]
fn test_huge_cache_ttl_degrades_to_uncached() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/forever",
            HandlerRef::closure(|_, ctx| {
                ctx.cache_for(i64::MAX);
                Ok("forever".into())
            }),
        )
        .unwrap();
    let harness = Harness::new(Config::default(), routes, FilterChain::new(), vec![]);

    let (status, sent) = harness.run(get("/forever"));
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(sent.body().as_ref(), b"forever");
    assert!(harness.cache.is_empty());
}

#[test]
fn test_closure_controller_timer_covers_execution() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/slow",
            HandlerRef::closure(|_, _| {
                std::thread::sleep(Duration::from_millis(30));
                Ok("slow".into())
            }),
        )
        .unwrap();
    let harness = Harness::new(Config::default(), routes, FilterChain::new(), vec![]);

    let mut dispatcher = harness.dispatcher(get("/slow"));
    dispatcher.run(None).unwrap();

    let timer = dispatcher.timer();
    assert!(timer.elapsed(phase::CONTROLLER).unwrap() >= Duration::from_millis(30));
    assert!(!timer.is_running(phase::CONTROLLER));
    assert!(!timer.is_running(phase::CONTROLLER_CONSTRUCTOR));
}

#[test]
fn test_cached_headers_keep_insertion_order() {
    let mut routes = RouteTable::new();
    routes
        .add(
            "/ordered",
            HandlerRef::closure(|_, ctx| {
                ctx.cache_for(60);
                let mut resp = Response::with_status(StatusCode::OK);
                resp.set_header("Zeta", "1");
                resp.set_header("Alpha", "2");
                resp.set_body("ordered");
                Ok(resp.into())
            }),
        )
        .unwrap();
    let harness = Harness::new(Config::default(), routes, FilterChain::new(), vec![]);

    let (_, first) = harness.run(get("/ordered"));
    let (_, replayed) = harness.run(get("/ordered"));

    let expected = [
        ("Zeta".to_string(), "1".to_string()),
        ("Alpha".to_string(), "2".to_string()),
    ];
    assert_eq!(first.headers(), &expected);
    assert_eq!(replayed.headers(), &expected);
}

#[test]
fn test_cached_body_stored_before_substitution() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut routes = RouteTable::new();
    routes
        .add(
            "/timed",
            HandlerRef::closure(move |_, ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.cache_for(60);
                ctx.echo("took ");
                Ok("{elapsed_time} seconds".into())
            }),
        )
        .unwrap();
    let config = Config::default();
    let key = cache_key(&get("/timed"), &config.cache);
    let harness = Harness::new(config, routes, FilterChain::new(), vec![]);

    let (_, first) = harness.run(get("/timed"));
    let (_, second) = harness.run(get("/timed"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stored = CacheEnvelope::decode(&harness.cache.get(&key).unwrap()).unwrap();
    assert_eq!(stored.body.as_ref(), b"took {elapsed_time} seconds");

    let seconds = Regex::new(r"\d+\.\d{4}").unwrap();
    let mask = |body: String| seconds.replace_all(&body, "N").into_owned();
    assert_eq!(mask(body_str(&first)), "took N seconds");
    assert_eq!(mask(body_str(&first)), mask(body_str(&second)));
}

#[test]
fn test_previous_url_stored_for_cli_and_ajax() {
    let mut routes = RouteTable::new();
    routes
        .add("/report", HandlerRef::closure(|_, _| Ok("report".into())))
        .unwrap();
    routes
        .add("/poll", HandlerRef::closure(|_, _| Ok("poll".into())))
        .unwrap();
    let harness = Harness::new(Config::default(), routes, FilterChain::new(), vec![]);

    harness.run(Request::from(CliRequest::from_args(["report"])));
    assert_eq!(
        harness.session.get(PREVIOUS_URL_KEY).as_deref(),
        Some("/report")
    );

    let ajax = Request::from(
        http::Request::builder()
            .uri("/poll")
            .header("host", "example.com")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Bytes::new())
            .unwrap(),
    );
    harness.run(ajax);
    assert_eq!(
        harness.session.get(PREVIOUS_URL_KEY).as_deref(),
        Some("http://example.com/poll")
    );
}
