use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{parse_filter_config, Filter};
use crate::{
    core::{context::RequestContext, error::DispatchResult},
    http::{request::Request, response::Response},
};

pub const FILTER_NAME: &str = "request-id";

const DEFAULT_HEADER_NAME: &str = "X-Request-Id";
const ALGORITHM_UUID: &str = "uuid";
const ALGORITHM_SIMPLE: &str = "simple";

/// Context key under which the request id is stored
pub const REQUEST_ID_KEY: &str = "request-id";

/// Creates a Request ID filter instance with the given configuration.
pub fn create_request_id_filter(cfg: YamlValue) -> DispatchResult<Arc<dyn Filter>> {
    let config: FilterConfig = parse_filter_config(FILTER_NAME, cfg)?;
    Ok(Arc::new(FilterRequestId { config }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct FilterConfig {
    #[serde(default = "FilterConfig::default_header_name")]
    #[validate(length(min = 1))]
    header_name: String,
    #[serde(default = "FilterConfig::default_include_in_response")]
    include_in_response: bool,
    #[serde(default = "FilterConfig::default_algorithm")]
    #[validate(custom(function = "FilterConfig::validate_algorithm"))]
    algorithm: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            header_name: Self::default_header_name(),
            include_in_response: Self::default_include_in_response(),
            algorithm: Self::default_algorithm(),
        }
    }
}

impl FilterConfig {
    fn default_header_name() -> String {
        DEFAULT_HEADER_NAME.to_string()
    }

    fn default_include_in_response() -> bool {
        true
    }

    fn default_algorithm() -> String {
        ALGORITHM_UUID.to_string()
    }

    fn validate_algorithm(algorithm: &String) -> Result<(), ValidationError> {
        if algorithm == ALGORITHM_UUID || algorithm == ALGORITHM_SIMPLE {
            Ok(())
        } else {
            Err(ValidationError::new(
                "algorithm must be either 'uuid' or 'simple'",
            ))
        }
    }
}

/// Propagates the caller's request id, or generates one, and echoes it back
pub struct FilterRequestId {
    config: FilterConfig,
}

impl FilterRequestId {
    fn generate(&self) -> String {
        match self.config.algorithm.as_str() {
            ALGORITHM_SIMPLE => Uuid::new_v4().simple().to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }
}

impl Filter for FilterRequestId {
    fn name(&self) -> &str {
        FILTER_NAME
    }

    fn before(
        &self,
        request: &Request,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let value = match request.header(&self.config.header_name) {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => self.generate(),
        };
        ctx.set(REQUEST_ID_KEY, value);
        Ok(None)
    }

    fn after(
        &self,
        _request: &Request,
        response: &Response,
        ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        if !self.config.include_in_response {
            return Ok(None);
        }
        // The before phase may not have run for this path
        let value = match ctx.get_str(REQUEST_ID_KEY) {
            Some(v) => v.to_string(),
            None => {
                let generated = self.generate();
                ctx.set(REQUEST_ID_KEY, generated.clone());
                generated
            }
        };

        let mut resp = response.clone();
        resp.set_header(self.config.header_name.clone(), value);
        Ok(Some(resp))
    }
}
