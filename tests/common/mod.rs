use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use blog_client::config::ApiConfig;
use blog_client::http::ApiClient;
use blog_client::notify::Notifier;
use blog_client::session::{MemorySessionStore, Session, SessionStore};
use blog_client::Result;

/// Notifier that remembers every message and redirect.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }

    fn navigate_to_login(&self, route: &str) {
        self.navigations.lock().unwrap().push(route.to_string());
    }
}

/// Memory-backed store that counts how often it is cleared.
#[allow(dead_code)]
#[derive(Debug)]
pub struct CountingStore {
    inner: MemorySessionStore,
    clears: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn with_session(session: Session) -> Self {
        Self {
            inner: MemorySessionStore::with_session(session),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SessionStore for CountingStore {
    fn snapshot(&self) -> Session {
        self.inner.snapshot()
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        self.inner.set_access_token(token)
    }

    fn replace(&self, session: Session) -> Result<()> {
        self.inner.replace(session)
    }

    fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

#[allow(dead_code)]
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    }
}

/// Client over real `reqwest` transports pointed at `base_url`.
#[allow(dead_code)]
pub fn make_client(
    base_url: &str,
    store: &Arc<dyn SessionStore>,
    notifier: &Arc<RecordingNotifier>,
) -> ApiClient {
    let notifier: Arc<dyn Notifier> = Arc::clone(notifier) as Arc<dyn Notifier>;
    ApiClient::new(&api_config(base_url), Arc::clone(store), notifier)
        .expect("client should build")
}

/// `{code, data, msg}` body.
#[allow(dead_code)]
pub fn envelope(code: i64, data: serde_json::Value, msg: &str) -> serde_json::Value {
    serde_json::json!({ "code": code, "data": data, "msg": msg })
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
