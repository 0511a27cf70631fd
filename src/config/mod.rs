use std::fs;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::error::{DispatchResult, ErrorContext},
    filter::{is_known_filter, Phase},
};

#[derive(Default, Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub app: App,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub log: Log,

    #[serde(default)]
    #[validate(nested)]
    pub routing: Routing,

    #[serde(default)]
    #[validate(nested)]
    pub routes: Vec<RouteConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub filters: Vec<FilterConfig>,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> DispatchResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .with_context(&format!("Unable to read conf file from {path}"))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> DispatchResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse yaml conf: {}", e))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> DispatchResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct App {
    /// Base URL used when the request carries no authority
    #[serde(default)]
    pub base_url: Option<String>,

    /// Redirect every plain HTTP request to HTTPS
    #[serde(default)]
    pub force_global_secure_requests: bool,

    #[serde(default = "App::default_hsts_max_age")]
    pub hsts_max_age: u64,

    #[serde(default = "App::default_locale")]
    #[validate(length(min = 1))]
    pub default_locale: String,

    #[serde(default)]
    pub supported_locales: Vec<String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            base_url: None,
            force_global_secure_requests: false,
            hsts_max_age: Self::default_hsts_max_age(),
            default_locale: Self::default_locale(),
            supported_locales: Vec::new(),
        }
    }
}

impl App {
    fn default_hsts_max_age() -> u64 {
        31_536_000
    }

    fn default_locale() -> String {
        "en".to_string()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Include the query string in page cache keys
    #[serde(default)]
    pub cache_query_string: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "Log::default_level")]
    pub level: String,

    /// Append log lines to this file instead of stderr
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            path: None,
        }
    }
}

impl Log {
    fn default_level() -> String {
        "info".to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Routing::validate_override"))]
pub struct Routing {
    /// Map `/controller/method/args...` onto controllers without explicit routes
    #[serde(default)]
    pub auto_route: bool,

    #[serde(default = "Routing::default_controller")]
    #[validate(length(min = 1))]
    pub default_controller: String,

    #[serde(default = "Routing::default_method")]
    #[validate(length(min = 1))]
    pub default_method: String,

    /// `Controller::method` run instead of the built-in 404 page
    #[serde(default)]
    pub not_found_override: Option<String>,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            auto_route: false,
            default_controller: Self::default_controller(),
            default_method: Self::default_method(),
            not_found_override: None,
        }
    }
}

impl Routing {
    fn default_controller() -> String {
        "Home".to_string()
    }

    fn default_method() -> String {
        "index".to_string()
    }

    fn validate_override(&self) -> Result<(), ValidationError> {
        match &self.not_found_override {
            Some(spec) if !is_handler_spec(spec) => {
                Err(ValidationError::new("not_found_override_format"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "RouteConfig::validate_target"))]
pub struct RouteConfig {
    #[validate(length(min = 1))]
    pub uri: String,

    /// `Controller::method`
    #[serde(default)]
    pub controller: Option<String>,

    #[serde(default)]
    pub redirect: Option<String>,

    #[serde(default)]
    #[validate(range(min = 300, max = 399))]
    pub code: Option<u16>,
}

impl RouteConfig {
    fn validate_target(&self) -> Result<(), ValidationError> {
        match (&self.controller, &self.redirect) {
            (Some(controller), None) => {
                if !is_handler_spec(controller) {
                    return Err(ValidationError::new("controller_format"));
                }
                if self.code.is_some() {
                    return Err(ValidationError::new("code_requires_redirect"));
                }
                Ok(())
            }
            (None, Some(_)) => Ok(()),
            _ => Err(ValidationError::new("controller_xor_redirect")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "FilterConfig::validate_name"))]
pub struct FilterConfig {
    pub name: String,

    #[validate(length(min = 1))]
    pub phases: Vec<Phase>,

    /// Path regexes this filter is limited to; empty means every path
    #[serde(default)]
    pub uri: Vec<String>,

    /// Path regexes this filter never runs for
    #[serde(default)]
    pub except: Vec<String>,

    /// Filter-specific settings
    #[serde(default)]
    pub config: YamlValue,
}

impl FilterConfig {
    fn validate_name(&self) -> Result<(), ValidationError> {
        if is_known_filter(&self.name) {
            Ok(())
        } else {
            Err(ValidationError::new("unknown_filter"))
        }
    }
}

fn is_handler_spec(spec: &str) -> bool {
    spec.split_once("::")
        .is_some_and(|(c, m)| !c.trim().is_empty() && !m.trim().is_empty())
}
