//! Command-line interface definition for the blog client
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for logging in and out and for issuing
//! authenticated requests against the blog API.

use clap::{Parser, Subcommand};

/// blog-client - authenticated command-line client for the blog API
///
/// Keeps a persistent login session and transparently refreshes expired
/// access tokens.
#[derive(Parser, Debug, Clone)]
#[command(name = "blog-client")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the session backend (memory, file, keyring)
    #[arg(long)]
    pub session_backend: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account name
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long, env = "BLOG_CLIENT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show the profile of the logged-in user
    Whoami,

    /// Show the stored session with tokens masked
    Session,

    /// Issue an arbitrary request and print the envelope data
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, PATCH)
        method: String,

        /// Path relative to the base URL, e.g. /api/article/list
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE")]
        query: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            base_url: None,
            session_backend: None,
            command: Commands::Session,
        }
    }
}

/// Splits `key=value` query arguments.
///
/// # Errors
///
/// Returns the offending argument when it has no `=`.
pub fn parse_query_pairs(raw: &[String]) -> std::result::Result<Vec<(String, String)>, String> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| pair.clone())
        })
        .collect()
}
