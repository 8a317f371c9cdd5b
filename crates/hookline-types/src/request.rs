//! Inbound request normalization.
//!
//! The HTTP layer reads the transport request into a [`RawRequest`];
//! [`NormalizedRequest::from_raw`] then folds header names, keeps the exact
//! body bytes for signature verification, and decodes the body as JSON on a
//! best-effort basis. Verification always runs over `raw_body`, never over a
//! re-serialized `body`.

use std::collections::HashMap;

use serde_json::Value;

/// A transport-level request exactly as read off the wire.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: String,
    pub url: String,
    /// Header pairs in arrival order; names may use any casing.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Canonical view of an inbound webhook delivery. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    raw_body: Vec<u8>,
    body: Value,
}

impl NormalizedRequest {
    /// Normalize a raw request.
    ///
    /// Header names are lower-cased; when a header repeats, the last
    /// occurrence wins. A body that is not valid JSON decodes to `Value::Null`.
    pub fn from_raw(raw: RawRequest) -> Self {
        let mut headers = HashMap::with_capacity(raw.headers.len());
        for (name, value) in raw.headers {
            headers.insert(name.to_ascii_lowercase(), value);
        }

        let body = serde_json::from_slice(&raw.body).unwrap_or(Value::Null);

        Self {
            method: raw.method,
            url: raw.url,
            headers,
            raw_body: raw.body,
            body,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Look up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The body bytes exactly as received.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// The parsed JSON body (`Value::Null` when not JSON).
    pub fn body(&self) -> &Value {
        &self.body
    }
}
