/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `auth`    - login, logout and whoami
- `session` - inspect the stored session
- `request` - issue an arbitrary envelope call

Handlers build an [`ApiClient`] from the loaded configuration and print
results to stdout; user-facing failures reach stderr through the
[`ConsoleNotifier`].
*/

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::{BlogError, Result};
use crate::http::ApiClient;
use crate::notify::ConsoleNotifier;
use crate::session::open_store;

/// Opens the configured session store and builds a client over it.
pub fn build_client(config: &Config) -> Result<ApiClient> {
    let store = open_store(&config.session)?;
    ApiClient::new(&config.api, store, Arc::new(ConsoleNotifier))
}

fn print_json(value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(BlogError::Serialization)?;
    println!("{}", rendered);
    Ok(())
}

// Login, logout and profile
pub mod auth {
    use super::*;
    use crate::api::UserApi;
    use colored::Colorize;

    /// Signs in and persists the session.
    pub async fn login(config: &Config, username: &str, password: &str) -> Result<()> {
        let client = build_client(config)?;
        let session = UserApi::new(&client).login(username, password).await?;
        println!(
            "{} as {} (user id {})",
            "Logged in".green().bold(),
            username,
            session
                .user_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        Ok(())
    }

    pub async fn logout(config: &Config) -> Result<()> {
        let client = build_client(config)?;
        UserApi::new(&client).logout().await?;
        println!("{}", "Logged out".green().bold());
        Ok(())
    }

    /// Prints the signed-in user's profile.
    pub async fn whoami(config: &Config) -> Result<()> {
        let client = build_client(config)?;
        if !client.store().snapshot().is_authenticated() {
            return Err(BlogError::Session(
                "not logged in; run `blog-client login` first".to_string(),
            )
            .into());
        }
        let info = UserApi::new(&client).info().await?;
        print_json(&serde_json::to_value(info).map_err(BlogError::Serialization)?)
    }
}

// Stored session inspection
pub mod session {
    use super::*;
    use crate::session::mask_token;
    use serde_json::json;

    /// Prints the stored session with both tokens masked.
    pub fn show(config: &Config) -> Result<()> {
        let store = open_store(&config.session)?;
        let session = store.snapshot();
        print_json(&json!({
            "backend": config.session.backend,
            "authenticated": session.is_authenticated(),
            "user_id": session.user_id,
            "access_token": mask_token(&session.access_token),
            "refresh_token": mask_token(&session.refresh_token),
            "updated_at": session.updated_at,
        }))
    }
}

// Arbitrary envelope calls
pub mod request {
    use super::*;
    use crate::cli::parse_query_pairs;
    use crate::http::ApiRequest;
    use reqwest::Method;

    /// Sends `method path` with optional JSON body and query pairs, then
    /// prints the unwrapped `data`.
    pub async fn run(
        config: &Config,
        method: &str,
        path: &str,
        data: Option<&str>,
        query: &[String],
    ) -> Result<()> {
        let request = build_request(method, path, data, query)?;
        let client = build_client(config)?;
        let value: Value = client.send(request).await?;
        print_json(&value)
    }

    /// Validates the command-line pieces of a request before any I/O.
    pub fn build_request(
        method: &str,
        path: &str,
        data: Option<&str>,
        query: &[String],
    ) -> Result<ApiRequest> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| BlogError::Config(format!("Invalid HTTP method: {}", method)))?;
        let pairs = parse_query_pairs(query).map_err(|pair| {
            BlogError::Config(format!("Query parameter must be KEY=VALUE: {}", pair))
        })?;

        let mut request = ApiRequest::new(method, path);
        for (key, value) in pairs {
            request = request.query(key, value);
        }
        if let Some(raw) = data {
            let body: Value = serde_json::from_str(raw)
                .map_err(|e| BlogError::Config(format!("--data is not valid JSON: {}", e)))?;
            request = request.json(body);
        }
        Ok(request)
    }
}
