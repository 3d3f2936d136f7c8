//! Error types for the blog client
//!
//! This module defines the error taxonomy produced by the HTTP pipeline and
//! the supporting layers (configuration, session persistence), using
//! `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Why a request never reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The request did not complete within the configured timeout.
    Timeout,
    /// DNS resolution or connection establishment failed.
    Unreachable,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkErrorKind::Timeout => write!(f, "timeout"),
            NetworkErrorKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Main error type for blog client operations
///
/// The first five variants are the classified outcomes of the request
/// pipeline; callers that need to react to a specific failure downcast the
/// `anyhow::Error` returned by the client to this type.
#[derive(Error, Debug)]
pub enum BlogError {
    /// The transport never reached the server
    #[error("Network error ({kind}): {message}")]
    Network {
        /// Timeout or unreachable
        kind: NetworkErrorKind,
        /// Underlying transport message
        message: String,
    },

    /// Non-2xx response without a business envelope
    #[error("HTTP error: status {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// Envelope-level failure reported by the server
    #[error("Business error {code}: {msg}")]
    Business {
        /// Envelope `code`
        code: i64,
        /// Envelope `msg` (may be empty)
        msg: String,
    },

    /// Terminal authentication failure; the session must be re-established
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// A 2xx response whose body is not a business envelope
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store persistence errors
    #[error("Session store error: {0}")]
    Session(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl BlogError {
    /// Returns `true` for the terminal authentication failure.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, BlogError::AuthExpired(_))
    }
}

/// Result type alias for blog client operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
