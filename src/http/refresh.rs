//! Single-flight access token refresh
//!
//! When any number of in-flight requests learn at about the same time that
//! the access token has expired, exactly one of them calls the refresh
//! endpoint. The others queue behind it and are released together when the
//! refresh settles: with the new token on success, or with a terminal
//! authentication error on failure.
//!
//! # State machine
//!
//! ```text
//!            first 401                 refresh settles
//!   Idle  ------------->  Refreshing  ------------------> Idle
//!                          |      ^
//!                          +------+  later 401s queue as waiters
//! ```
//!
//! The `Idle -> Refreshing` check-and-set and the queueing of waiters happen
//! under a synchronous mutex that is never held across an `.await`, so the
//! first request to look always wins.
//!
//! A failed refresh clears the session, notifies once and navigates to the
//! login route once, no matter how many requests were waiting.
//!
//! The refresh call goes over a dedicated transport with no response stage,
//! so a 401 from the refresh endpoint cannot re-enter the coordinator.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{BlogError, Result};
use crate::http::envelope::Envelope;
use crate::http::transport::{ApiRequest, Transport};
use crate::notify::{Notifier, AUTH_EXPIRED_MESSAGE};
use crate::session::SessionStore;

/// Body of the refresh request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest<'a> {
    pub user_id: i64,
    pub refresh_token: &'a str,
}

/// `data` of a successful refresh response.
///
/// Only `access_token` is used; the refresh token is kept as it was.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<String>,
}

type Waiter = oneshot::Sender<std::result::Result<String, String>>;

#[derive(Debug)]
enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

/// Coordinates token refresh for one [`crate::http::ApiClient`].
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    refresh_path: String,
    login_route: String,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("refresh_path", &self.refresh_path)
            .field("login_route", &self.login_route)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    ///
    /// # Arguments
    ///
    /// * `transport` - Bare transport used only for the refresh call. Must not
    ///   be the transport business requests go through.
    /// * `store` - Session store holding the credentials.
    /// * `notifier` - Receives the terminal failure message and redirect.
    /// * `refresh_path` - Path of the refresh endpoint.
    /// * `login_route` - Where to send the user when the refresh fails.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        refresh_path: impl Into<String>,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
            transport,
            store,
            notifier,
            refresh_path: refresh_path.into(),
            login_route: login_route.into(),
        }
    }

    /// `true` while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Number of requests queued behind the in-flight refresh.
    pub fn waiting(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Obtains a fresh access token for a request that was rejected with 401.
    ///
    /// The first caller while idle performs the refresh; callers arriving
    /// while it is in flight wait for its outcome. Every caller gets the same
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::AuthExpired`] when the refresh fails. By then the
    /// session has been cleared and the notifier told, once per refresh.
    pub async fn recover(&self) -> Result<String> {
        loop {
            let queued = {
                let mut state = self.lock_state();
                if let RefreshState::Refreshing { waiters } = &mut *state {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                } else {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            };

            let Some(rx) = queued else {
                let in_flight = InFlight::arm(self);
                let outcome = self.refresh().await;
                in_flight.disarm();
                return self.settle(outcome);
            };

            tracing::debug!("Token refresh in flight, waiting for it");
            match rx.await {
                Ok(Ok(token)) => return Ok(token),
                Ok(Err(reason)) => return Err(BlogError::AuthExpired(reason).into()),
                // The refreshing caller went away before settling; the
                // session is untouched, so take over the refresh.
                Err(_) => tracing::debug!("Token refresh abandoned, retrying it"),
            }
        }
    }

    /// Calls the refresh endpoint once. `Err` carries the failure reason.
    async fn refresh(&self) -> std::result::Result<String, String> {
        let credentials = self.store.refresh_credentials();
        let Some((user_id, refresh_token)) = credentials.complete() else {
            return Err("no refresh credentials stored".to_string());
        };

        let body = serde_json::to_value(RefreshTokenRequest {
            user_id,
            refresh_token,
        })
        .map_err(|e| format!("failed to encode refresh request: {}", e))?;
        let request = ApiRequest::post(self.refresh_path.as_str()).json(body);

        tracing::info!("Access token expired, refreshing for user {}", user_id);
        let response = self
            .transport
            .execute(&request)
            .await
            .map_err(|e| format!("refresh request failed: {}", e))?;

        if !response.is_success() {
            return Err(format!("refresh endpoint returned HTTP {}", response.status));
        }
        let envelope = Envelope::parse(&response.body)
            .ok_or_else(|| "refresh response is not a result envelope".to_string())?;
        if !envelope.is_success() {
            return Err(format!(
                "refresh rejected with code {}: {}",
                envelope.code,
                envelope.message()
            ));
        }
        let tokens: RefreshedTokens = envelope
            .into_data()
            .map_err(|e| format!("malformed refresh response: {}", e))?;
        if tokens.access_token.is_empty() {
            return Err("refresh response carried no access token".to_string());
        }
        Ok(tokens.access_token)
    }

    /// Applies the outcome, returns to idle and releases every waiter.
    fn settle(&self, outcome: std::result::Result<String, String>) -> Result<String> {
        match outcome {
            Ok(token) => {
                if let Err(e) = self.store.set_access_token(&token) {
                    tracing::warn!("Failed to store refreshed access token: {}", e);
                }
                let waiters = self.take_waiters();
                tracing::info!(
                    "Access token refreshed, releasing {} queued request(s)",
                    waiters.len()
                );
                for waiter in waiters {
                    let _ = waiter.send(Ok(token.clone()));
                }
                Ok(token)
            }
            Err(reason) => {
                tracing::warn!("Token refresh failed: {}", reason);
                if let Err(e) = self.store.clear() {
                    tracing::warn!("Failed to clear session: {}", e);
                }
                let waiters = self.take_waiters();
                self.notifier.notify(AUTH_EXPIRED_MESSAGE);
                self.notifier.navigate_to_login(&self.login_route);
                for waiter in waiters {
                    let _ = waiter.send(Err(reason.clone()));
                }
                Err(BlogError::AuthExpired(reason).into())
            }
        }
    }

    fn take_waiters(&self) -> Vec<Waiter> {
        let mut state = self.lock_state();
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the coordinator to idle if the refreshing future is dropped
/// before it settles. Dropping the waiters' senders wakes them so one of
/// them can run the refresh instead.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn arm(coordinator: &'a RefreshCoordinator) -> Self {
        Self {
            coordinator,
            armed: true,
        }
    }

    /// The refresh call completed; `settle` takes over from here.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let waiters = self.coordinator.take_waiters();
        tracing::warn!(
            "Token refresh abandoned, handing it to {} queued request(s)",
            waiters.len()
        );
    }
}
