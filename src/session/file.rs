//! JSON-file session persistence
//!
//! The session is kept in memory and written through to disk on every
//! mutation, so a later process picks up the same login. The file holds a
//! single serialized [`Session`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;

use crate::error::{BlogError, Result};
use crate::session::{Session, SessionStore};

/// Session store backed by a JSON file.
///
/// # Examples
///
/// ```no_run
/// use blog_client::session::file::FileSessionStore;
/// use blog_client::session::{Session, SessionStore};
///
/// let store = FileSessionStore::open("/tmp/blog-session.json").unwrap();
/// store.replace(Session::new("access", "refresh", 1)).unwrap();
/// assert_eq!(store.access_token(), "access");
/// ```
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    cache: Mutex<Session>,
}

impl FileSessionStore {
    /// Default session file inside the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::Session`] when no home directory can be found.
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "blog", "blog-client").ok_or_else(|| {
            BlogError::Session("Could not determine data directory".to_string())
        })?;
        Ok(proj_dirs.data_dir().join("session.json"))
    }

    /// Opens the store at `path`, loading any session already saved there.
    ///
    /// A missing file is an anonymous session; the file and its parent
    /// directory are created on the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let session = Self::load(&path)?;
        tracing::debug!(
            "Opened session file {} (authenticated: {})",
            path.display(),
            session.is_authenticated()
        );
        Ok(Self {
            path,
            cache: Mutex::new(session),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Session> {
        if !path.exists() {
            return Ok(Session::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Session::default());
        }
        let session = serde_json::from_str(&contents).map_err(BlogError::Serialization)?;
        Ok(session)
    }

    fn persist(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create session directory {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file {}", self.path.display()))?;
        Ok(())
    }

    fn update(&self, mutate: impl FnOnce(&mut Session)) -> Result<()> {
        let mut guard = self
            .cache
            .lock()
            .map_err(|_| BlogError::Session("session lock poisoned".to_string()))?;
        mutate(&mut guard);
        self.persist(&guard)
    }
}

impl SessionStore for FileSessionStore {
    fn snapshot(&self) -> Session {
        match self.cache.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        self.update(|session| {
            session.access_token = token.to_string();
            session.updated_at = Some(Utc::now());
        })
    }

    fn replace(&self, session: Session) -> Result<()> {
        self.update(|current| *current = session)
    }

    fn clear(&self) -> Result<()> {
        self.update(|session| *session = Session::default())
    }
}
