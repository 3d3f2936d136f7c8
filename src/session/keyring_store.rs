//! Session persistence via OS keyring
//!
//! The whole [`Session`] is serialized to JSON and stored as a single secret
//! (Keychain on macOS, Secret Service on Linux, Windows Credential Manager on
//! Windows). Entries are namespaced per profile so several logins can coexist.

use chrono::Utc;

use crate::error::{BlogError, Result};
use crate::session::{Session, SessionStore};

/// Keyring-backed session store.
///
/// Every call goes to the credential store; nothing is cached in process.
///
/// # Examples
///
/// ```no_run
/// use blog_client::session::keyring_store::KeyringSessionStore;
/// use blog_client::session::SessionStore;
///
/// let store = KeyringSessionStore::new("default");
/// println!("logged in: {}", store.snapshot().is_authenticated());
/// ```
#[derive(Debug, Clone)]
pub struct KeyringSessionStore {
    profile: String,
}

impl KeyringSessionStore {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }

    /// Keyring service name for this profile.
    fn service_name(&self) -> String {
        format!("blog-client-{}", self.profile)
    }

    fn entry(&self) -> Result<keyring::Entry> {
        let entry =
            keyring::Entry::new(&self.service_name(), &self.profile).map_err(BlogError::Keyring)?;
        Ok(entry)
    }

    /// Reads the stored session; `Ok(None)` when nothing has been saved.
    pub fn load(&self) -> Result<Option<Session>> {
        match self.entry()?.get_password() {
            Ok(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(BlogError::Keyring(e).into()),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let json_str = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&json_str)
            .map_err(BlogError::Keyring)?;
        Ok(())
    }
}

impl SessionStore for KeyringSessionStore {
    fn snapshot(&self) -> Session {
        match self.load() {
            Ok(session) => session.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to read session from keyring: {}", e);
                Session::default()
            }
        }
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        let mut session = self.load()?.unwrap_or_default();
        session.access_token = token.to_string();
        session.updated_at = Some(Utc::now());
        self.save(&session)
    }

    fn replace(&self, session: Session) -> Result<()> {
        self.save(&session)
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(BlogError::Keyring(e).into()),
        }
    }
}
