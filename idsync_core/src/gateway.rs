//! API gateway seam
//!
//! The engine only consumes a synchronous-looking `call(request) -> response`
//! capability. Request signing, TLS, and transport concerns live behind this
//! trait in the binary crate; tests substitute a scripted mock.

use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// HTTP verb subset used by the identity API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        };
        f.write_str(verb)
    }
}

/// One request against the identity API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `api/authn/v2/teams`
    pub path: String,
    /// Query parameters, encoded by the gateway implementation
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Value of a query parameter, if present (used by tests and logging)
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parsed response: status code plus JSON body (`null` when the body was
/// empty or not JSON)
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `_embedded.<name>` list the identity API wraps search results in
    pub fn embedded_list(&self, name: &str) -> Option<&[Value]> {
        self.body
            .get("_embedded")
            .and_then(|embedded| embedded.get(name))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }
}

/// Signed transport to the identity API. One request in flight at a time;
/// implementations must not retry on their own.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError>;
}

/// First entry in `list` whose `field` equals `value` case-insensitively,
/// in API response order.
pub fn find_exact_match<'a>(list: &'a [Value], field: &str, value: &str) -> Option<&'a Value> {
    let wanted = value.to_lowercase();
    list.iter().find(|item| {
        item.get(field)
            .and_then(Value::as_str)
            .is_some_and(|candidate| candidate.to_lowercase() == wanted)
    })
}
