//! Request module
//!
//! The immutable per-request value handed to handlers and middleware.

use hyper::{Method, Uri};
use std::collections::HashMap;

/// Named path parameters bound during matching
pub type Params = HashMap<String, String>;

/// Decoded query string parameters (last value wins on duplicate keys)
pub type Query = HashMap<String, String>;

/// Incoming request as seen by handlers
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Query,
    params: Params,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>, query: Query, params: Params) -> Self {
        Self {
            method,
            path: path.into(),
            query,
            params,
        }
    }

    /// Build from a request URI; params start empty
    pub fn from_uri(method: Method, uri: &Uri) -> Self {
        Self::new(method, uri.path(), parse_query(uri.query()), Params::new())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Raw request path, not percent-decoded
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// JSONP callback name, if a non-empty `callback` parameter is present
    pub fn jsonp_callback(&self) -> Option<&str> {
        self.query_param("callback").filter(|cb| !cb.is_empty())
    }
}

/// Parse an `application/x-www-form-urlencoded` query string
pub fn parse_query(raw: Option<&str>) -> Query {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}
