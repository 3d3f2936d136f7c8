//! Configuration management for the blog client
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlogError, Result};

/// Session backends accepted by [`SessionConfig::backend`].
pub const SESSION_BACKENDS: [&str; 3] = ["memory", "file", "keyring"];

/// Main configuration structure for the blog client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds), applied to both transports
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Path of the token refresh endpoint
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Response header carrying a proactively renewed access token
    #[serde(default = "default_renewal_header")]
    pub renewal_header: String,

    /// Route the user is sent to after a terminal authentication failure
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_refresh_path() -> String {
    "/api/user/refresh-token".to_string()
}

fn default_renewal_header() -> String {
    "x-new-token".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            refresh_path: default_refresh_path(),
            renewal_header: default_renewal_header(),
            login_route: default_login_route(),
        }
    }
}

impl ApiConfig {
    /// Timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backend: "memory", "file" or "keyring"
    #[serde(default = "default_session_backend")]
    pub backend: String,

    /// Session file location (file backend); platform data dir when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Profile name used to namespace keyring entries
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_session_backend() -> String {
    "file".to_string()
}

fn default_profile() -> String {
    "default".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            path: None,
            profile: default_profile(),
        }
    }
}

impl Config {
    /// Load configuration from file, then apply environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BlogError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("BLOG_CLIENT_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("BLOG_CLIENT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid BLOG_CLIENT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(backend) = std::env::var("BLOG_CLIENT_SESSION_BACKEND") {
            self.session.backend = backend.to_lowercase();
        }

        if let Ok(path) = std::env::var("BLOG_CLIENT_SESSION_PATH") {
            self.session.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(backend) = &cli.session_backend {
            self.session.backend = backend.to_lowercase();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`BlogError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            BlogError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(BlogError::Config(format!(
                "api.base_url must use http or https, got {}",
                base.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 || self.api.timeout_seconds > 300 {
            return Err(BlogError::Config(
                "api.timeout_seconds must be between 1 and 300".to_string(),
            )
            .into());
        }

        if !self.api.refresh_path.starts_with('/') {
            return Err(
                BlogError::Config("api.refresh_path must start with '/'".to_string()).into(),
            );
        }

        if !self.api.login_route.starts_with('/') {
            return Err(
                BlogError::Config("api.login_route must start with '/'".to_string()).into(),
            );
        }

        if self.api.renewal_header.trim().is_empty() {
            return Err(
                BlogError::Config("api.renewal_header cannot be empty".to_string()).into(),
            );
        }

        if !SESSION_BACKENDS.contains(&self.session.backend.as_str()) {
            return Err(BlogError::Config(format!(
                "Invalid session backend: {}. Must be one of: {}",
                self.session.backend,
                SESSION_BACKENDS.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}
