//! User-facing error messages and the login redirect
//!
//! The pipeline reports every terminal failure to a [`Notifier`] exactly
//! once. Terminal authentication failures additionally ask the notifier to
//! send the user back to the login entry point.

use colored::Colorize;

use crate::error::{BlogError, NetworkErrorKind};

/// Message shown when the session cannot be recovered.
pub const AUTH_EXPIRED_MESSAGE: &str = "Login expired, please log in again";

/// Fallback for anything without a more specific message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// Receiver of user-visible pipeline events.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show `message` to the user.
    fn notify(&self, message: &str);

    /// Send the user to the login entry point at `route`.
    fn navigate_to_login(&self, route: &str);
}

/// Default message for an HTTP status or envelope code.
pub fn default_status_message(status: i64) -> &'static str {
    match status {
        400 => "Invalid request parameters",
        403 => "Access denied",
        404 => "Requested resource not found",
        500 => "Internal server error",
        _ => GENERIC_FAILURE_MESSAGE,
    }
}

/// Maps a classified error to the message the user sees.
pub fn message_for(error: &BlogError) -> String {
    match error {
        BlogError::Network {
            kind: NetworkErrorKind::Timeout,
            ..
        } => "Request timed out, please try again later".to_string(),
        BlogError::Network {
            kind: NetworkErrorKind::Unreachable,
            ..
        } => "Network connection failed, please check your network".to_string(),
        BlogError::Http { status } => default_status_message(i64::from(*status)).to_string(),
        BlogError::Business { code, msg } => {
            if msg.trim().is_empty() {
                default_status_message(*code).to_string()
            } else {
                msg.clone()
            }
        }
        BlogError::AuthExpired(_) => AUTH_EXPIRED_MESSAGE.to_string(),
        _ => GENERIC_FAILURE_MESSAGE.to_string(),
    }
}

/// Notifier that only emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "blog_client::notify", "{}", message);
    }

    fn navigate_to_login(&self, route: &str) {
        tracing::warn!(target: "blog_client::notify", "Login required, redirecting to {}", route);
    }
}

/// Notifier for the terminal: coloured messages on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    fn navigate_to_login(&self, route: &str) {
        eprintln!(
            "{} session cleared ({}); run `blog-client login` to sign in again",
            "login required:".yellow().bold(),
            route
        );
    }
}
