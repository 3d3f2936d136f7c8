//! blog-client - authenticated HTTP client library for the blog API
//!
//! This library provides the request pipeline the blog frontend talks to the
//! backend through: bearer-token injection, business-envelope unwrapping,
//! silent token renewal and single-flight token refresh with queued replay.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `http`: transport, envelope, pipeline stages, refresh coordinator and client
//! - `session`: session model and its memory, file and keyring stores
//! - `notify`: user-facing error messages and the login redirect
//! - `api`: typed wrappers over user endpoints
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use blog_client::{ApiClient, Config};
//! use blog_client::notify::TracingNotifier;
//! use blog_client::session::open_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = open_store(&config.session)?;
//!     let client = ApiClient::new(&config.api, store, Arc::new(TracingNotifier))?;
//!     let profile: serde_json::Value = client.get("/api/user/info").await?;
//!     println!("{}", profile);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{BlogError, NetworkErrorKind, Result};
pub use http::{ApiClient, ApiRequest, RefreshCoordinator};
pub use notify::Notifier;
pub use session::{Session, SessionStore};
