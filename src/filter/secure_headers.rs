use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::Validate;

use super::{parse_filter_config, Filter};
use crate::{
    core::{context::RequestContext, error::DispatchResult},
    http::{request::Request, response::Response},
};

pub const FILTER_NAME: &str = "secure-headers";

const DEFAULT_HEADERS: [(&str, &str); 5] = [
    ("X-Frame-Options", "SAMEORIGIN"),
    ("X-Content-Type-Options", "nosniff"),
    ("X-Download-Options", "noopen"),
    ("X-Permitted-Cross-Domain-Policies", "none"),
    ("Referrer-Policy", "same-origin"),
];

pub fn create_secure_headers_filter(cfg: YamlValue) -> DispatchResult<Arc<dyn Filter>> {
    let config: FilterConfig = parse_filter_config(FILTER_NAME, cfg)?;

    let mut headers: Vec<(String, String)> = DEFAULT_HEADERS
        .iter()
        .filter(|(name, _)| !config.disable.iter().any(|d| d.eq_ignore_ascii_case(name)))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    for (name, value) in config.headers {
        match headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => headers.push((name, value)),
        }
    }

    Ok(Arc::new(FilterSecureHeaders {
        headers,
        overwrite: config.overwrite,
    }))
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
struct FilterConfig {
    /// Extra headers, or new values for the built-in ones
    #[serde(default)]
    headers: BTreeMap<String, String>,
    /// Built-in headers to leave out
    #[serde(default)]
    disable: Vec<String>,
    /// Replace values the handler already set
    #[serde(default)]
    overwrite: bool,
}

/// Adds hardening headers to every response
pub struct FilterSecureHeaders {
    headers: Vec<(String, String)>,
    overwrite: bool,
}

impl Filter for FilterSecureHeaders {
    fn name(&self) -> &str {
        FILTER_NAME
    }

    fn after(
        &self,
        _request: &Request,
        response: &Response,
        _ctx: &mut RequestContext,
    ) -> DispatchResult<Option<Response>> {
        let mut resp = response.clone();
        for (name, value) in &self.headers {
            if self.overwrite || !resp.has_header(name) {
                resp.set_header(name.clone(), value.clone());
            }
        }
        Ok(Some(resp))
    }
}
