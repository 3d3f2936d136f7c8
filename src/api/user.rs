//! User account endpoints: login, logout and profile

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};
use crate::session::Session;

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub user_info: UserInfo,
}

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// User endpoints bound to a client.
#[derive(Debug, Clone, Copy)]
pub struct UserApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UserApi<'a> {
    pub const LOGIN_PATH: &'static str = "/api/user/login";
    pub const LOGOUT_PATH: &'static str = "/api/user/logout";
    pub const INFO_PATH: &'static str = "/api/user/info";

    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Signs in and replaces the stored session with the issued tokens.
    ///
    /// # Errors
    ///
    /// Returns the classified request error, or a persistence error if the
    /// new session cannot be stored.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let response: LoginResponse = self
            .client
            .post(Self::LOGIN_PATH, &LoginRequest { username, password })
            .await?;

        let session = Session::new(
            response.access_token,
            response.refresh_token,
            response.user_info.id,
        );
        self.client.store().replace(session.clone())?;
        tracing::info!("Signed in as user {}", response.user_info.id);
        Ok(session)
    }

    /// Signs out. The local session is cleared even if the server call fails.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self
            .client
            .send::<Value>(ApiRequest::post(Self::LOGOUT_PATH))
            .await
        {
            tracing::debug!("Ignoring logout failure: {}", e);
        }
        self.client.store().clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Fetches the signed-in user's profile.
    pub async fn info(&self) -> Result<UserInfo> {
        self.client.get(Self::INFO_PATH).await
    }
}
