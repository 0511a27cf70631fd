//! Reference route table
//!
//! Patterns use `matchit` syntax (`/users/{id}`, `/files/{*rest}`). Captured
//! parameters are handed to handlers positionally, in pattern order. A
//! `{locale}` segment is not a parameter: it selects the request locale.

use matchit::{Match, Router as MatchRouter};

use super::{HandlerRef, RouteMatch, RouteOutcome};
use crate::{
    config::{App, Config, Routing},
    config_error,
    core::{error::DispatchResult, traits::RouteResolver},
    utils::request::normalize_path,
};

const LOCALE_PARAM: &str = "locale";
const DEFAULT_REDIRECT_CODE: u16 = 302;

#[derive(Debug, Clone)]
enum RouteTarget {
    Handler(HandlerRef),
    Redirect { target: String, code: u16 },
}

#[derive(Debug, Clone)]
struct RouteEntry {
    pattern: String,
    target: RouteTarget,
    param_names: Vec<String>,
}

/// Route table matching request paths to handlers
pub struct RouteTable {
    matcher: MatchRouter<usize>,
    entries: Vec<RouteEntry>,
    default_locale: String,
    supported_locales: Vec<String>,
    auto_route: bool,
    default_controller: String,
    default_method: String,
    not_found: Option<HandlerRef>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let app = App::default();
        let routing = Routing::default();
        Self {
            matcher: MatchRouter::new(),
            entries: Vec::new(),
            default_locale: app.default_locale,
            supported_locales: app.supported_locales,
            auto_route: routing.auto_route,
            default_controller: routing.default_controller,
            default_method: routing.default_method,
            not_found: None,
        }
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from the `app`, `routing` and `routes` sections
    pub fn from_config(config: &Config) -> DispatchResult<Self> {
        let mut table = Self::new()
            .with_locales(
                config.app.default_locale.clone(),
                config.app.supported_locales.clone(),
            )
            .with_defaults(
                config.routing.default_controller.clone(),
                config.routing.default_method.clone(),
            );
        table.auto_route = config.routing.auto_route;

        if let Some(spec) = &config.routing.not_found_override {
            let handler = HandlerRef::parse(spec)
                .ok_or_else(|| config_error!("Invalid 404 override '{}'", spec))?;
            table.set_404_override(handler);
        }

        for route in &config.routes {
            match (&route.controller, &route.redirect) {
                (Some(controller), None) => {
                    let handler = HandlerRef::parse(controller).ok_or_else(|| {
                        config_error!("Invalid handler '{}' for route '{}'", controller, route.uri)
                    })?;
                    table.add(&route.uri, handler)?;
                }
                (None, Some(target)) => {
                    table.add_redirect(
                        &route.uri,
                        target,
                        route.code.unwrap_or(DEFAULT_REDIRECT_CODE),
                    )?;
                }
                _ => {
                    return Err(config_error!(
                        "Route '{}' must define exactly one of controller or redirect",
                        route.uri
                    ))
                }
            }
        }

        log::debug!("Built route table with {} routes", table.len());
        Ok(table)
    }

    pub fn with_locales(mut self, default_locale: String, supported: Vec<String>) -> Self {
        self.default_locale = default_locale;
        self.supported_locales = supported;
        self
    }

    pub fn with_defaults(mut self, controller: String, method: String) -> Self {
        self.default_controller = controller;
        self.default_method = method;
        self
    }

    pub fn with_auto_route(mut self, enabled: bool) -> Self {
        self.auto_route = enabled;
        self
    }

    pub fn add(&mut self, pattern: &str, handler: HandlerRef) -> DispatchResult<&mut Self> {
        self.insert(pattern, RouteTarget::Handler(handler))
    }

    pub fn add_redirect(
        &mut self,
        pattern: &str,
        target: &str,
        code: u16,
    ) -> DispatchResult<&mut Self> {
        self.insert(
            pattern,
            RouteTarget::Redirect {
                target: target.to_string(),
                code,
            },
        )
    }

    pub fn set_404_override(&mut self, handler: HandlerRef) {
        self.not_found = Some(handler);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered patterns in insertion order
    pub fn patterns(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.pattern.as_str()).collect()
    }

    fn insert(&mut self, pattern: &str, target: RouteTarget) -> DispatchResult<&mut Self> {
        let pattern = normalize_path(pattern);
        let index = self.entries.len();
        self.matcher
            .insert(pattern.clone(), index)
            .map_err(|e| config_error!("Failed to insert route '{}': {}", pattern, e))?;

        self.entries.push(RouteEntry {
            param_names: param_names(&pattern),
            pattern,
            target,
        });
        Ok(self)
    }

    fn pick_locale(&self, requested: &str) -> String {
        if self.supported_locales.iter().any(|l| l == requested) {
            requested.to_string()
        } else {
            self.default_locale.clone()
        }
    }

    fn auto_route(&self, path: &str) -> RouteOutcome {
        let mut segments = path.split('/').filter(|s| !s.is_empty());

        let controller = match segments.next() {
            Some(segment) => upper_first(segment),
            None => self.default_controller.clone(),
        };
        let method = segments
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_method.clone());
        let params = segments.map(str::to_string).collect();

        RouteOutcome::Matched(RouteMatch {
            handler: HandlerRef::Named { controller, method },
            params,
            locale: None,
        })
    }
}

impl RouteResolver for RouteTable {
    fn resolve(&self, path: &str) -> RouteOutcome {
        let path = normalize_path(path);

        if let Ok(Match { value, params }) = self.matcher.at(&path) {
            let entry = &self.entries[*value];
            return match &entry.target {
                RouteTarget::Redirect { target, code } => RouteOutcome::Redirect {
                    target: target.clone(),
                    code: *code,
                },
                RouteTarget::Handler(handler) => {
                    let locale = params.get(LOCALE_PARAM).map(|l| self.pick_locale(l));
                    let values = entry
                        .param_names
                        .iter()
                        .filter(|name| name.as_str() != LOCALE_PARAM)
                        .filter_map(|name| params.get(name.as_str()))
                        .map(str::to_string)
                        .collect();
                    RouteOutcome::Matched(RouteMatch {
                        handler: handler.clone(),
                        params: values,
                        locale,
                    })
                }
            };
        }

        if self.auto_route {
            return self.auto_route(&path);
        }

        RouteOutcome::NotFound {
            reason: format!("Can't find a route for '{path}'."),
        }
    }

    fn not_found_override(&self) -> Option<HandlerRef> {
        self.not_found.clone()
    }
}

/// Parameter names of a matchit pattern, in order
fn param_names(pattern: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        if rest[start..].starts_with("{{") {
            rest = &rest[start + 2..];
            continue;
        }
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = rest[start + 1..start + len].trim_start_matches('*');
        names.push(name.to_string());
        rest = &rest[start + len + 1..];
    }
    names
}

fn upper_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOutput;

    fn matched(outcome: RouteOutcome) -> RouteMatch {
        match outcome {
            RouteOutcome::Matched(m) => m,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_positional_params() {
        let mut table = RouteTable::new();
        table
            .add("/users/{id}/posts/{post}", HandlerRef::named("Posts", "show"))
            .unwrap();

        let m = matched(table.resolve("/users/42/posts/7/"));
        assert_eq!(m.params, vec!["42".to_string(), "7".to_string()]);
        assert_eq!(format!("{:?}", m.handler), "Posts::show");
        assert!(m.locale.is_none());
    }

    #[test]
    fn test_catch_all() {
        let mut table = RouteTable::new();
        table
            .add("/files/{*rest}", HandlerRef::closure(|_, _| Ok(HandlerOutput::Empty)))
            .unwrap();
        let m = matched(table.resolve("/files/a/b.txt"));
        assert_eq!(m.params, vec!["a/b.txt".to_string()]);
    }

    #[test]
    fn test_locale_segment() {
        let mut table =
            RouteTable::new().with_locales("en".to_string(), vec!["en".into(), "fr".into()]);
        table
            .add("/{locale}/about", HandlerRef::named("Pages", "about"))
            .unwrap();

        let m = matched(table.resolve("/fr/about"));
        assert_eq!(m.locale.as_deref(), Some("fr"));
        assert!(m.params.is_empty());

        let fallback = matched(table.resolve("/de/about"));
        assert_eq!(fallback.locale.as_deref(), Some("en"));
    }

    #[test]
    fn test_redirect_route() {
        let mut table = RouteTable::new();
        table.add_redirect("/old", "/new", 301).unwrap();
        match table.resolve("/old") {
            RouteOutcome::Redirect { target, code } => {
                assert_eq!(target, "/new");
                assert_eq!(code, 301);
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found_and_conflict() {
        let mut table = RouteTable::new();
        table.add("/a", HandlerRef::named("A", "index")).unwrap();
        assert!(table.add("/a", HandlerRef::named("B", "index")).is_err());

        match table.resolve("/missing") {
            RouteOutcome::NotFound { reason } => assert!(reason.contains("/missing")),
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(table.not_found_override().is_none());
    }

    #[test]
    fn test_auto_route() {
        let table = RouteTable::new()
            .with_auto_route(true)
            .with_defaults("Home".into(), "index".into());

        let m = matched(table.resolve("/blog/archive/2024/05"));
        assert_eq!(format!("{:?}", m.handler), "Blog::archive");
        assert_eq!(m.params, vec!["2024".to_string(), "05".to_string()]);

        assert_eq!(format!("{:?}", matched(table.resolve("/blog")).handler), "Blog::index");
        assert_eq!(format!("{:?}", matched(table.resolve("/")).handler), "Home::index");
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_yaml(
            r#"
routing:
  not_found_override: "Errors::missing"
routes:
  - uri: /users/{id}
    controller: "Users::show"
  - uri: /legacy
    redirect: /users
"#,
        )
        .unwrap();

        let table = RouteTable::from_config(&config).unwrap();
        assert_eq!(table.patterns(), vec!["/users/{id}", "/legacy"]);
        assert!(matches!(
            table.resolve("/legacy"),
            RouteOutcome::Redirect { code: 302, .. }
        ));
        assert_eq!(
            format!("{:?}", table.not_found_override().unwrap()),
            "Errors::missing"
        );
    }

    #[test]
    fn test_param_names() {
        assert_eq!(param_names("/a/{x}/b/{*y}"), vec!["x", "y"]);
        assert!(param_names("/plain").is_empty());
    }
}
