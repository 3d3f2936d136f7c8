//! Scripted in-process transport for unit tests
//!
//! [`FakeTransport`] answers every request with the result of a closure and
//! records what it was sent, so tests can drive the pipeline and the refresh
//! coordinator without a network. An optional delay suspends each call, which
//! lets concurrent requests pile up behind an in-flight refresh.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use crate::http::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type Responder =
    Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static>;

pub struct FakeTransport {
    responder: Responder,
    delay: Duration,
    sent: Mutex<Vec<ApiRequest>>,
}

impl std::fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeTransport")
            .field("delay", &self.delay)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Suspends every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.responder)(request)
    }
}

/// `{code, data, msg}` response with the given HTTP status.
pub fn envelope(status: u16, code: i64, data: Value, msg: &str) -> ApiResponse {
    ApiResponse::json(status, &json!({"code": code, "data": data, "msg": msg}))
}

/// Successful refresh-endpoint response carrying `access_token`.
pub fn refreshed(access_token: &str) -> ApiResponse {
    envelope(
        200,
        200,
        json!({
            "accessToken": access_token,
            "refreshToken": "r1",
            "tokenType": "Bearer",
            "expiresIn": "7200"
        }),
        "ok",
    )
}

/// Business endpoint that accepts only `Bearer <valid>` and echoes the path.
pub fn accepts_only(valid: &'static str) -> FakeTransport {
    FakeTransport::new(move |request| {
        if request.authorization() == Some(format!("Bearer {}", valid).as_str()) {
            Ok(envelope(200, 200, json!(request.path), "ok"))
        } else {
            Ok(envelope(401, 401, Value::Null, "login expired"))
        }
    })
}
