//! Full-page cache: envelope format, key derivation and stores
//!
//! A cached page is stored as a JSON envelope
//! `{"headers": {...}, "body": "<base64>"}` under a key derived from the
//! request URL. The body is kept before `{elapsed_time}` substitution so the
//! timing reflects the request that replays it.

pub mod memory;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    config::CacheConfig,
    core::error::{DispatchError, DispatchResult},
    http::{request::Request, response::Response},
};

pub use memory::MemoryCache;

/// Serialized form of a cached page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// Header name/value pairs in the order they were set
    #[serde(with = "ordered_headers")]
    pub headers: Vec<(String, String)>,
    #[serde(with = "base64_body")]
    pub body: Bytes,
}

impl CacheEnvelope {
    /// Capture the headers of `response` together with `body`
    pub fn capture(response: &Response, body: Bytes) -> Self {
        Self {
            headers: response.headers().to_vec(),
            body,
        }
    }

    pub fn encode(&self) -> DispatchResult<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| DispatchError::Cache(format!("failed to encode envelope: {e}")))
    }

    /// Decode a stored envelope; anything malformed is reported as corrupt
    pub fn decode(raw: &[u8]) -> DispatchResult<Self> {
        serde_json::from_slice(raw).map_err(|e| DispatchError::CacheCorrupt(e.to_string()))
    }
}

/// Headers as a JSON object whose key order follows the pair order
mod ordered_headers {
    use std::fmt;

    use serde::{
        de::{MapAccess, Visitor},
        ser::SerializeMap,
        Deserializer, Serializer,
    };

    pub fn serialize<S: Serializer>(
        headers: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (name, value) in headers {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    struct HeadersVisitor;

    impl<'de> Visitor<'de> for HeadersVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of header names to string values")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut headers = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, value)) = access.next_entry::<String, String>()? {
                headers.push((name, value));
            }
            Ok(headers)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        deserializer.deserialize_map(HeadersVisitor)
    }
}

mod base64_body {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

/// Lowercase hex SHA-256 of the request's cache identity.
///
/// CLI requests hash `"<METHOD> <path>"`. HTTP requests hash the full URL,
/// with the query string only when `cache_query_string` is on.
pub fn cache_key(request: &Request, config: &CacheConfig) -> String {
    let identity = match request {
        Request::Cli(cli) => format!("{} {}", request.method(), cli.path()),
        Request::Incoming(req) => {
            let authority = req.authority().unwrap_or_default();
            let mut url = format!("{}://{}{}", req.scheme(), authority, req.path());
            if config.cache_query_string {
                if let Some(query) = req.uri.query() {
                    url.push('?');
                    url.push_str(query);
                }
            }
            url
        }
    };

    format!("{:x}", Sha256::digest(identity.as_bytes()))
}
