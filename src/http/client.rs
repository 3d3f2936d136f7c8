//! Authenticated API client
//!
//! [`ApiClient`] is the pipeline business code talks to. Each call runs the
//! request stage, the transport and the response stage in order; a 401 hands
//! the request to the shared [`RefreshCoordinator`] and replays it once with
//! the token it returns.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::config::ApiConfig;
use crate::error::{BlogError, Result};
use crate::http::refresh::RefreshCoordinator;
use crate::http::stage::{Inspection, RequestStage, ResponseStage};
use crate::http::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::notify::{message_for, Notifier};
use crate::session::SessionStore;

/// Envelope-aware HTTP client with transparent token refresh.
///
/// Cheap to share behind an `Arc`; every clone of that `Arc` uses the same
/// refresh coordinator, so concurrent 401s trigger a single refresh.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use blog_client::config::ApiConfig;
/// use blog_client::http::ApiClient;
/// use blog_client::notify::TracingNotifier;
/// use blog_client::session::MemorySessionStore;
///
/// # async fn run() -> anyhow::Result<()> {
/// let client = ApiClient::new(
///     &ApiConfig::default(),
///     Arc::new(MemorySessionStore::new()),
///     Arc::new(TracingNotifier),
/// )?;
/// let articles: serde_json::Value = client.get("/api/article/list").await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    request_stage: RequestStage,
    response_stage: ResponseStage,
    coordinator: Arc<RefreshCoordinator>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("transport", &self.transport)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Builds a client over two independent `reqwest` transports.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(
        config: &ApiConfig,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let base_url = url::Url::parse(&config.base_url).map_err(BlogError::Url)?;
        let transport = ReqwestTransport::new(base_url.clone(), config.timeout())?;
        let refresh_transport = ReqwestTransport::new(base_url, config.timeout())?;
        Ok(Self::with_transports(
            Arc::new(transport),
            Arc::new(refresh_transport),
            store,
            notifier,
            config,
        ))
    }

    /// Builds a client over caller-supplied transports.
    ///
    /// `refresh_transport` is used only for the refresh call and should be a
    /// different instance from `transport`.
    pub fn with_transports(
        transport: Arc<dyn Transport>,
        refresh_transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        config: &ApiConfig,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(
            refresh_transport,
            Arc::clone(&store),
            Arc::clone(&notifier),
            config.refresh_path.as_str(),
            config.login_route.as_str(),
        );
        Self {
            transport,
            request_stage: RequestStage::new(Arc::clone(&store)),
            response_stage: ResponseStage::new(Arc::clone(&store), config.renewal_header.as_str()),
            coordinator: Arc::new(coordinator),
            store,
            notifier,
        }
    }

    /// Session store the client reads credentials from.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Sends `request` and decodes the envelope's `data` into `T`.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`BlogError`] (wrapped in `anyhow`) after the
    /// notifier has been told about it.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let span = tracing::debug_span!(
            "api_request",
            id = %request.id,
            method = %request.method,
            path = %request.path
        );
        let data = self.dispatch(request).instrument(span).await?;
        serde_json::from_value(data).map_err(|e| {
            self.reject(BlogError::InvalidResponse(format!(
                "unexpected data shape: {}",
                e
            )))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |request, (key, value)| {
                request.query(*key, *value)
            });
        self.send(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(BlogError::Serialization)?;
        self.send(ApiRequest::post(path).json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(BlogError::Serialization)?;
        self.send(ApiRequest::put(path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::delete(path)).await
    }

    async fn dispatch(&self, mut request: ApiRequest) -> Result<Value> {
        self.request_stage.apply(&mut request);
        loop {
            let outcome = self.transport.execute(&request).await;
            match self.response_stage.inspect(outcome, &request) {
                Inspection::Resolved(data) => return Ok(data),
                Inspection::Failed(error) => return Err(self.reject(error)),
                Inspection::Unauthorized => {
                    request.mark_retried();
                    // The coordinator has already notified on failure.
                    let token = self.coordinator.recover().await?;
                    request.set_bearer(&token);
                    tracing::debug!("Replaying with refreshed token");
                }
            }
        }
    }

    fn reject(&self, error: BlogError) -> anyhow::Error {
        tracing::warn!("Request failed: {}", error);
        self.notifier.notify(&message_for(&error));
        error.into()
    }
}
