use std::{collections::HashMap, sync::Arc};

use http::{header, StatusCode};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::Validate;

use super::{parse_filter_config, Filter};
use crate::{
    config_error,
    core::{context::RequestContext, error::DispatchResult},
    http::{request::Request, response::Response},
};

pub const FILTER_NAME: &str = "echo";

/// Creates an Echo filter instance with the given configuration.
pub fn create_echo_filter(cfg: YamlValue) -> DispatchResult<Arc<dyn Filter>> {
    let config: FilterConfig = parse_filter_config(FILTER_NAME, cfg)?;
    let status = StatusCode::from_u16(config.status)
        .map_err(|e| config_error!("Invalid echo filter status {}: {}", config.status, e))?;
    Ok(Arc::new(FilterEcho { config, status }))
}

/// Configuration for the Echo filter.
/// Specifies the response body, status and optional headers.
#[derive(Debug, Serialize, Deserialize, Validate)]
struct FilterConfig {
    /// The response body that will be echoed.
    #[serde(default)]
    body: String,

    #[serde(default = "FilterConfig::default_status")]
    #[validate(range(min = 100, max = 599))]
    status: u16,

    /// Additional response headers to include in the echoed response.
    #[serde(default)]
    headers: HashMap<String, String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            body: String::new(),
            status: Self::default_status(),
            headers: HashMap::new(),
        }
    }
}

impl FilterConfig {
    fn default_status() -> u16 {
        200
    }
}

/// Answers the request directly from the before phase
pub struct FilterEcho {
    config: FilterConfig,
    status: StatusCode,
}

impl Filter for FilterEcho {
    fn name(&self) -> &str {
        FILTER_NAME
    }

    fn before(
        &self,
        _request: &Request,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let mut resp = Response::with_status(self.status);
        for (k, v) in &self.config.headers {
            resp.set_header(k.clone(), v.clone());
        }
        resp.set_header(
            header::CONTENT_LENGTH.as_str(),
            self.config.body.len().to_string(),
        );
        resp.set_body(self.config.body.clone());

        ctx.halt(resp);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::CliRequest;

    #[test]
    fn test_echo_halts_with_configured_response() {
        let cfg: YamlValue = serde_yaml::from_str(
            "body: maintenance\nstatus: 503\nheaders:\n  Retry-After: \"120\"",
        )
        .unwrap();
        let filter = create_echo_filter(cfg).unwrap();
        let mut ctx = RequestContext::new();

        let reported = filter
            .before(&Request::from(CliRequest::default()), &mut ctx)
            .unwrap();
        assert!(reported.is_none());

        let resp = ctx.take_halt().unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.header("retry-after"), Some("120"));
        assert_eq!(resp.header("content-length"), Some("11"));
        assert_eq!(resp.body().as_ref(), b"maintenance");
    }

    #[test]
    fn test_invalid_status() {
        let cfg: YamlValue = serde_yaml::from_str("status: 42").unwrap();
        assert!(create_echo_filter(cfg).is_err());
    }
}
