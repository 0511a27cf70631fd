use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::{Validate, ValidationError};

use super::{parse_filter_config, Filter};
use crate::{
    core::{context::RequestContext, error::DispatchResult},
    http::{request::Request, response::Response},
    utils::request::get_client_ip,
};

pub const FILTER_NAME: &str = "request-log";

pub fn create_request_log_filter(cfg: YamlValue) -> DispatchResult<Arc<dyn Filter>> {
    let config: FilterConfig = parse_filter_config(FILTER_NAME, cfg)?;
    let level = match config.level.as_str() {
        "debug" => log::Level::Debug,
        _ => log::Level::Info,
    };
    Ok(Arc::new(FilterRequestLog { level }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct FilterConfig {
    #[serde(default = "FilterConfig::default_level")]
    #[validate(custom(function = "FilterConfig::validate_level"))]
    level: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl FilterConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn validate_level(level: &String) -> Result<(), ValidationError> {
        match level.as_str() {
            "info" | "debug" => Ok(()),
            _ => Err(ValidationError::new("level must be either 'info' or 'debug'")),
        }
    }
}

/// Logs each request on the way in and its status on the way out
pub struct FilterRequestLog {
    level: log::Level,
}

impl Filter for FilterRequestLog {
    fn name(&self) -> &str {
        FILTER_NAME
    }

    fn before(
        &self,
        request: &Request,
        _ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let client = request
            .as_incoming()
            .map(|req| get_client_ip(&req.headers))
            .filter(|ip| !ip.is_empty())
            .unwrap_or_else(|| "-".to_string());
        log::log!(
            self.level,
            "{} {} client={}",
            request.method(),
            request.path(),
            client
        );
        Ok(None)
    }

    fn after(
        &self,
        request: &Request,
        response: &Response,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let elapsed_ms = ctx
            .request_start()
            .map(|start| start.elapsed().as_millis())
            .unwrap_or_default();
        log::log!(
            self.level,
            "{} {} -> {} ({} ms)",
            request.method(),
            request.path(),
            response.status().as_u16(),
            elapsed_ms
        );
        Ok(None)
    }
}
