//! Persisted login session
//!
//! The [`SessionStore`] trait is the only way the HTTP pipeline touches
//! credentials. Reads never fail: a backend that cannot be read is logged and
//! reported as an anonymous session. Writes go through [`SessionStore::set_access_token`],
//! [`SessionStore::replace`] and [`SessionStore::clear`].
//!
//! # Backends
//!
//! - [`MemorySessionStore`] -- process-local, used by tests and one-shot runs
//! - [`file::FileSessionStore`] -- JSON file, survives restarts
//! - [`keyring_store::KeyringSessionStore`] -- OS credential store

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::{BlogError, Result};

pub mod file;
pub mod keyring_store;

/// Credentials for an authenticated user.
///
/// An empty `access_token` means the session is anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token attached to outbound requests.
    #[serde(default)]
    pub access_token: String,

    /// Long-lived token exchanged for a new access token on expiry.
    #[serde(default)]
    pub refresh_token: String,

    /// Identifier of the logged-in user, required by the refresh endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    /// Last time the session was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a fresh authenticated session.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user_id: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            user_id: Some(user_id),
            updated_at: Some(Utc::now()),
        }
    }

    /// Returns `true` when an access token is present.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn refresh_credentials(&self) -> RefreshCredentials {
        RefreshCredentials {
            user_id: self.user_id,
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// The pair sent to the refresh endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshCredentials {
    pub user_id: Option<i64>,
    pub refresh_token: String,
}

impl RefreshCredentials {
    /// Returns the user id and refresh token when both are present.
    pub fn complete(&self) -> Option<(i64, &str)> {
        match self.user_id {
            Some(id) if !self.refresh_token.is_empty() => Some((id, self.refresh_token.as_str())),
            _ => None,
        }
    }
}

/// Storage for the current [`Session`].
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Full copy of the stored session.
    fn snapshot(&self) -> Session;

    /// Current access token; empty when anonymous.
    fn access_token(&self) -> String {
        self.snapshot().access_token
    }

    /// Current user id and refresh token.
    fn refresh_credentials(&self) -> RefreshCredentials {
        self.snapshot().refresh_credentials()
    }

    /// Replaces only the access token, leaving the refresh token untouched.
    fn set_access_token(&self, token: &str) -> Result<()>;

    /// Replaces the whole session (login).
    fn replace(&self, session: Session) -> Result<()>;

    /// Forgets every credential (logout).
    fn clear(&self) -> Result<()>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn snapshot(&self) -> Session {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| BlogError::Session("session lock poisoned".to_string()))?;
        guard.access_token = token.to_string();
        guard.updated_at = Some(Utc::now());
        Ok(())
    }

    fn replace(&self, session: Session) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| BlogError::Session("session lock poisoned".to_string()))?;
        *guard = session;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| BlogError::Session("session lock poisoned".to_string()))?;
        *guard = Session::default();
        Ok(())
    }
}

/// Shortens a token for display, keeping the first and last four characters.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    match chars.len() {
        0 => "<none>".to_string(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }
}

/// Builds the store selected by `config.backend`.
///
/// # Errors
///
/// Returns [`BlogError::Config`] for an unknown backend name, or the
/// backend's own error when it cannot be opened.
pub fn open_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemorySessionStore::new())),
        "file" => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => file::FileSessionStore::default_path()?,
            };
            Ok(Arc::new(file::FileSessionStore::open(path)?))
        }
        "keyring" => Ok(Arc::new(keyring_store::KeyringSessionStore::new(
            config.profile.clone(),
        ))),
        other => Err(BlogError::Config(format!("Unknown session backend: {}", other)).into()),
    }
}
