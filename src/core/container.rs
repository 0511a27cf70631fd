//! Dependency injection container
//!
//! The [`ServiceContainer`] holds every collaborator shared by the requests of
//! one application: configuration, routes, filters, controllers, cache,
//! session, hooks and the response emitter. Each dispatcher borrows it through
//! an `Arc`; nothing here is a global.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{
    error::DispatchResult,
    registry::ControllerRegistry,
    traits::{CacheStore, FilterRunner, ResponseEmitter, RouteResolver, SessionStore},
};
use crate::{
    cache::MemoryCache,
    config::Config,
    filter::FilterChain,
    handler::ControllerDescriptor,
    hooks::Hooks,
    http::emitter::StdoutEmitter,
    router::RouteTable,
    session::NoSession,
};

/// Main dependency injection container
pub struct ServiceContainer {
    config: Config,
    routes: ArcSwap<Arc<dyn RouteResolver>>,
    filters: Arc<dyn FilterRunner>,
    controllers: ControllerRegistry,
    cache: Arc<dyn CacheStore>,
    session: Arc<dyn SessionStore>,
    emitter: Arc<dyn ResponseEmitter>,
    hooks: Hooks,
}

impl ServiceContainer {
    /// Container with default collaborators and an empty route table
    pub fn new() -> Self {
        ServiceContainerBuilder::new().build()
    }

    pub fn builder() -> ServiceContainerBuilder {
        ServiceContainerBuilder::new()
    }

    /// Build routes and filters from `config`; the remaining collaborators
    /// start with their defaults and can be replaced on the builder.
    pub fn builder_from_config(config: Config) -> DispatchResult<ServiceContainerBuilder> {
        let routes = RouteTable::from_config(&config)?;
        let filters = FilterChain::from_config(&config.filters)?;
        Ok(ServiceContainerBuilder::new()
            .config(config)
            .routes(Arc::new(routes))
            .filters(Arc::new(filters)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current route resolver
    pub fn routes(&self) -> Arc<dyn RouteResolver> {
        self.routes.load_full().as_ref().clone()
    }

    /// Atomically swap the route resolver; requests already running keep the old one
    pub fn reload_routes(&self, routes: Arc<dyn RouteResolver>) {
        log::info!("Reloading route table");
        self.routes.store(Arc::new(routes));
    }

    pub fn filters(&self) -> &dyn FilterRunner {
        self.filters.as_ref()
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    pub fn register_controller(&self, descriptor: ControllerDescriptor) {
        self.controllers.register(descriptor);
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    pub fn emitter(&self) -> &dyn ResponseEmitter {
        self.emitter.as_ref()
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ServiceContainerBuilder {
    config: Config,
    routes: Arc<dyn RouteResolver>,
    filters: Arc<dyn FilterRunner>,
    controllers: ControllerRegistry,
    cache: Arc<dyn CacheStore>,
    session: Arc<dyn SessionStore>,
    emitter: Arc<dyn ResponseEmitter>,
    hooks: Hooks,
}

impl Default for ServiceContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainerBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            routes: Arc::new(RouteTable::new()),
            filters: Arc::new(FilterChain::new()),
            controllers: ControllerRegistry::new(),
            cache: Arc::new(MemoryCache::new()),
            session: Arc::new(NoSession),
            emitter: Arc::new(StdoutEmitter),
            hooks: Hooks::new(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn routes(mut self, routes: Arc<dyn RouteResolver>) -> Self {
        self.routes = routes;
        self
    }

    pub fn filters(mut self, filters: Arc<dyn FilterRunner>) -> Self {
        self.filters = filters;
        self
    }

    pub fn controller(self, descriptor: ControllerDescriptor) -> Self {
        self.controllers.register(descriptor);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = session;
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn ResponseEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> ServiceContainer {
        ServiceContainer {
            config: self.config,
            routes: ArcSwap::from_pointee(self.routes),
            filters: self.filters,
            controllers: self.controllers,
            cache: self.cache,
            session: self.session,
            emitter: self.emitter,
            hooks: self.hooks,
        }
    }
}
