//! Request and response stages of the pipeline
//!
//! [`RequestStage`] attaches the bearer token; [`ResponseStage`] turns a raw
//! transport outcome into an [`Inspection`]. Neither stage suspends. The
//! response stage has exactly one side effect: a token pushed by the server in
//! the renewal header is written to the session store.

use std::sync::Arc;

use serde_json::Value;

use crate::error::BlogError;
use crate::http::envelope::{Envelope, UNAUTHORIZED_CODE};
use crate::http::transport::{ApiRequest, ApiResponse, TransportError};
use crate::session::SessionStore;

/// Injects `Authorization: Bearer <token>` from the session store.
#[derive(Debug, Clone)]
pub struct RequestStage {
    store: Arc<dyn SessionStore>,
}

impl RequestStage {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Leaves the headers untouched for an anonymous session.
    pub fn apply(&self, request: &mut ApiRequest) {
        let token = self.store.access_token();
        if !token.is_empty() {
            request.set_bearer(&token);
        }
    }
}

/// What the pipeline should do with a completed exchange.
#[derive(Debug)]
pub enum Inspection {
    /// Business success; the envelope's `data`.
    Resolved(Value),
    /// Login expired on a request that has not been through a refresh yet.
    Unauthorized,
    /// Terminal failure to surface to the caller.
    Failed(BlogError),
}

/// Unwraps envelopes and classifies failures.
#[derive(Debug, Clone)]
pub struct ResponseStage {
    store: Arc<dyn SessionStore>,
    renewal_header: String,
}

impl ResponseStage {
    pub fn new(store: Arc<dyn SessionStore>, renewal_header: impl Into<String>) -> Self {
        Self {
            store,
            renewal_header: renewal_header.into(),
        }
    }

    /// Classifies the outcome of sending `request`.
    pub fn inspect(
        &self,
        outcome: std::result::Result<ApiResponse, TransportError>,
        request: &ApiRequest,
    ) -> Inspection {
        let response = match outcome {
            Ok(response) => response,
            Err(error) => return Inspection::Failed(error.into()),
        };
        let envelope = Envelope::parse(&response.body);

        if response.is_success() {
            self.apply_renewal(&response);
            return match envelope {
                Some(envelope) if envelope.is_success() => Inspection::Resolved(envelope.data),
                Some(envelope) => Inspection::Failed(BlogError::Business {
                    code: envelope.code,
                    msg: envelope.message().to_string(),
                }),
                None => Inspection::Failed(BlogError::InvalidResponse(format!(
                    "HTTP {} without a result envelope",
                    response.status
                ))),
            };
        }

        match envelope {
            Some(envelope) if envelope.code == UNAUTHORIZED_CODE => {
                Self::unauthorized(request, envelope.message())
            }
            Some(envelope) => Inspection::Failed(BlogError::Business {
                code: envelope.code,
                msg: envelope.message().to_string(),
            }),
            None if response.status == 401 => Self::unauthorized(request, ""),
            None => Inspection::Failed(BlogError::Http {
                status: response.status,
            }),
        }
    }

    fn unauthorized(request: &ApiRequest, msg: &str) -> Inspection {
        if request.is_retried() {
            let reason = if msg.is_empty() {
                "rejected again after token refresh"
            } else {
                msg
            };
            return Inspection::Failed(BlogError::AuthExpired(reason.to_string()));
        }
        Inspection::Unauthorized
    }

    fn apply_renewal(&self, response: &ApiResponse) {
        let Some(token) = response
            .header(&self.renewal_header)
            .map(str::trim)
            .filter(|token| !token.is_empty())
        else {
            return;
        };
        match self.store.set_access_token(token) {
            Ok(()) => tracing::info!("Access token renewed by server"),
            Err(e) => tracing::warn!("Failed to store renewed access token: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use crate::session::{MemorySessionStore, Session};
    use serde_json::json;

    fn store_with(token: &str) -> Arc<dyn SessionStore> {
        Arc::new(MemorySessionStore::with_session(Session::new(token, "r1", 1)))
    }

    fn stage(store: &Arc<dyn SessionStore>) -> ResponseStage {
        ResponseStage::new(Arc::clone(store), "x-new-token")
    }

    fn envelope(status: u16, code: i64, data: Value, msg: &str) -> ApiResponse {
        ApiResponse::json(status, &json!({"code": code, "data": data, "msg": msg}))
    }

    #[test]
    fn test_request_stage_sets_bearer_header() {
        let stage = RequestStage::new(store_with("t1"));
        let mut request = ApiRequest::get("/api/user/info");
        stage.apply(&mut request);
        assert_eq!(request.authorization(), Some("Bearer t1"));
    }

    #[test]
    fn test_request_stage_leaves_anonymous_requests_alone() {
        let stage = RequestStage::new(Arc::new(MemorySessionStore::new()));
        let mut request = ApiRequest::get("/api/article/list");
        stage.apply(&mut request);
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_success_resolves_data() {
        let store = store_with("t1");
        let inspection = stage(&store).inspect(
            Ok(envelope(200, 200, json!({"id": 3}), "ok")),
            &ApiRequest::get("/a"),
        );
        assert!(matches!(inspection, Inspection::Resolved(v) if v == json!({"id": 3})));
    }

    #[test]
    fn test_envelope_with_msg_and_message_resolves() {
        let store = store_with("t1");
        let response = ApiResponse::json(
            200,
            &json!({"code": 200, "data": 5, "msg": "ok", "message": "ok"}),
        );
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Resolved(v) if v == json!(5)));
    }

    #[test]
    fn test_code_zero_is_success() {
        let store = store_with("t1");
        let inspection =
            stage(&store).inspect(Ok(envelope(200, 0, json!([1, 2]), "")), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Resolved(_)));
    }

    #[test]
    fn test_renewal_header_updates_store_and_still_resolves() {
        let store = store_with("t1");
        let response = envelope(200, 200, json!("payload"), "ok").with_header("X-New-Token", "t3");
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));

        assert!(matches!(inspection, Inspection::Resolved(v) if v == json!("payload")));
        assert_eq!(store.access_token(), "t3");
        assert_eq!(store.refresh_credentials().refresh_token, "r1");
    }

    #[test]
    fn test_renewal_header_applies_even_on_business_failure() {
        let store = store_with("t1");
        let response = envelope(200, 500, Value::Null, "nope").with_header("x-new-token", "t3");
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Failed(BlogError::Business { code: 500, .. })));
        assert_eq!(store.access_token(), "t3");
    }

    #[test]
    fn test_blank_renewal_header_is_ignored() {
        let store = store_with("t1");
        let response = envelope(200, 200, Value::Null, "").with_header("x-new-token", "  ");
        stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert_eq!(store.access_token(), "t1");
    }

    #[test]
    fn test_business_failure_on_2xx() {
        let store = store_with("t1");
        let inspection = stage(&store).inspect(
            Ok(envelope(200, 500, json!({"ignored": true}), "Title must not be empty")),
            &ApiRequest::get("/a"),
        );
        match inspection {
            Inspection::Failed(BlogError::Business { code, msg }) => {
                assert_eq!(code, 500);
                assert_eq!(msg, "Title must not be empty");
            }
            other => panic!("unexpected inspection: {other:?}"),
        }
    }

    #[test]
    fn test_2xx_without_envelope_is_invalid_response() {
        let store = store_with("t1");
        let response = ApiResponse::new(200, Default::default(), "plain text");
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Failed(BlogError::InvalidResponse(_))));
    }

    #[test]
    fn test_401_envelope_engages_refresh_once() {
        let store = store_with("t1");
        let response = envelope(401, 401, Value::Null, "login expired");
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Unauthorized));
    }

    #[test]
    fn test_401_after_retry_is_terminal() {
        let store = store_with("t1");
        let mut request = ApiRequest::get("/a");
        request.mark_retried();
        let inspection =
            stage(&store).inspect(Ok(envelope(401, 401, Value::Null, "expired")), &request);
        assert!(matches!(inspection, Inspection::Failed(BlogError::AuthExpired(m)) if m == "expired"));
    }

    #[test]
    fn test_bare_401_without_envelope_engages_refresh() {
        let store = store_with("t1");
        let response = ApiResponse::new(401, Default::default(), "");
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Unauthorized));
    }

    #[test]
    fn test_non_2xx_envelope_is_business_error() {
        let store = store_with("t1");
        let inspection = stage(&store).inspect(
            Ok(envelope(403, 403, Value::Null, "not yours")),
            &ApiRequest::get("/a"),
        );
        assert!(matches!(inspection, Inspection::Failed(BlogError::Business { code: 403, .. })));
    }

    #[test]
    fn test_non_2xx_without_envelope_is_http_error() {
        let store = store_with("t1");
        let response = ApiResponse::new(502, Default::default(), "<html>Bad Gateway</html>");
        let inspection = stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert!(matches!(inspection, Inspection::Failed(BlogError::Http { status: 502 })));
    }

    #[test]
    fn test_renewal_header_ignored_on_error_status() {
        let store = store_with("t1");
        let response = envelope(500, 500, Value::Null, "boom").with_header("x-new-token", "t9");
        stage(&store).inspect(Ok(response), &ApiRequest::get("/a"));
        assert_eq!(store.access_token(), "t1");
    }

    #[test]
    fn test_transport_failure_is_network_error() {
        let store = store_with("t1");
        let inspection = stage(&store).inspect(
            Err(TransportError::Timeout("15s elapsed".to_string())),
            &ApiRequest::get("/a"),
        );
        assert!(matches!(
            inspection,
            Inspection::Failed(BlogError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            })
        ));
    }
}
