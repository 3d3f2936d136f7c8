//! Network call primitive
//!
//! A [`Transport`] issues exactly one HTTP request and reports either the
//! completed exchange or a network-level failure. It never interprets the
//! response: status codes, envelopes and credentials are the business of the
//! stages in [`crate::http::stage`].
//!
//! Two independent instances are wired into an [`crate::http::ApiClient`]:
//! the one every business call goes through, and a bare one that only the
//! refresh coordinator uses.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{BlogError, NetworkErrorKind, Result};

/// Outbound request descriptor.
///
/// # Examples
///
/// ```
/// use blog_client::http::ApiRequest;
///
/// let request = ApiRequest::get("/api/article/list")
///     .query("page", "1")
///     .query("size", "10");
/// assert_eq!(request.path, "/api/article/list");
/// assert!(!request.is_retried());
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    /// Query string pairs, in order.
    pub query: Vec<(String, String)>,
    /// Extra request headers, keyed by lower-cased name.
    pub headers: HashMap<String, String>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Correlation id used in log spans.
    pub id: Uuid,
    /// Set once the request has been through a token refresh.
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            id: Uuid::new_v4(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a request header, replacing any value under the same name in
    /// any letter case.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(&name.into(), value.into());
        self
    }

    fn set_header(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_ascii_lowercase(), value);
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn set_bearer(&mut self, token: &str) {
        self.set_header("authorization", format!("Bearer {}", token));
    }

    /// Current `Authorization` header value, if set.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("authorization").map(String::as_str)
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lower-cased names.
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Builds a response with a JSON body and no headers.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, HashMap::new(), body.to_string())
    }

    /// Returns a copy with one extra header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to complete an exchange with the server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("server unreachable: {0}")]
    Unreachable(String),
}

impl TransportError {
    pub fn kind(&self) -> NetworkErrorKind {
        match self {
            TransportError::Timeout(_) => NetworkErrorKind::Timeout,
            TransportError::Unreachable(_) => NetworkErrorKind::Unreachable,
        }
    }
}

impl From<TransportError> for BlogError {
    fn from(error: TransportError) -> Self {
        let kind = error.kind();
        let message = match error {
            TransportError::Timeout(m) | TransportError::Unreachable(m) => m,
        };
        BlogError::Network { kind, message }
    }
}

/// Issues a single HTTP request.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Performs `request` once. Any HTTP status, including errors, is a
    /// completed exchange; only failures to talk to the server are `Err`.
    async fn execute(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

/// [`Transport`] over a `reqwest` client.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use url::Url;
/// use blog_client::http::ReqwestTransport;
///
/// let transport = ReqwestTransport::new(
///     Url::parse("http://localhost:8080").unwrap(),
///     Duration::from_secs(15),
/// )
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    base_url: url::Url,
}

impl ReqwestTransport {
    /// Builds a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::Client`] if the TLS backend cannot be initialised.
    pub fn new(base_url: url::Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BlogError::Client)?;
        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Joins `path` onto the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> std::result::Result<url::Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        };
        url::Url::parse(&joined)
            .map_err(|e| TransportError::Unreachable(format!("invalid URL {}: {}", joined, e)))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Unreachable(error.to_string())
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.endpoint(&request.path)?;
        let mut builder = self.http_client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?;

        tracing::debug!("{} {} -> {}", request.method, request.path, status);
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(url::Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_absolute_path() {
        let t = transport("http://localhost:8080");
        assert_eq!(
            t.endpoint("/api/user/info").unwrap().as_str(),
            "http://localhost:8080/api/user/info"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_prefix() {
        let t = transport("http://example.com/blog/");
        assert_eq!(
            t.endpoint("/api/user/info").unwrap().as_str(),
            "http://example.com/blog/api/user/info"
        );
        assert_eq!(
            t.endpoint("api/user/info").unwrap().as_str(),
            "http://example.com/blog/api/user/info"
        );
    }

    #[test]
    fn test_request_builders() {
        let mut request = ApiRequest::post("/api/comment/create")
            .json(json!({"articleId": 1}))
            .header("X-Trace", "abc");
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(json!({"articleId": 1})));
        assert_eq!(request.authorization(), None);

        request.set_bearer("tok");
        assert_eq!(request.authorization(), Some("Bearer tok"));
    }

    #[test]
    fn test_bearer_replaces_caller_authorization_in_any_case() {
        let mut request = ApiRequest::get("/a").header("authorization", "Bearer stale");
        request.set_bearer("fresh");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.authorization(), Some("Bearer fresh"));

        let request = request.header("AUTHORIZATION", "Basic abc");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.authorization(), Some("Basic abc"));
    }

    #[test]
    fn test_each_request_gets_its_own_id() {
        assert_ne!(ApiRequest::get("/a").id, ApiRequest::get("/a").id);
    }

    #[test]
    fn test_response_headers_are_case_insensitive() {
        let response = ApiResponse::json(200, &json!({})).with_header("X-New-Token", "t3");
        assert_eq!(response.header("x-new-token"), Some("t3"));
        assert_eq!(response.header("X-NEW-TOKEN"), Some("t3"));
        assert!(response.is_success());
        assert!(!ApiResponse::json(401, &json!({})).is_success());
    }

    #[test]
    fn test_transport_error_converts_to_network_error() {
        let error: BlogError = TransportError::Timeout("deadline".to_string()).into();
        assert!(matches!(
            error,
            BlogError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_classified() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let t = transport("http://127.0.0.1:9");
        let err = t.execute(&ApiRequest::get("/")).await.unwrap_err();
        assert_eq!(err.kind(), NetworkErrorKind::Unreachable);
    }
}
