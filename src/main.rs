//! blog-client - authenticated command-line client for the blog API
//!
#![doc = "blog-client"]
#![doc = "Main entry point for the blog-client command-line tool."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use blog_client::cli::{Cli, Commands};
use blog_client::commands;
use blog_client::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;
    tracing::debug!(
        "Using API {} with {} session backend",
        config.api.base_url,
        config.session.backend
    );

    // Execute command
    match cli.command {
        Commands::Login { username, password } => {
            tracing::info!("Logging in as {}", username);
            commands::auth::login(&config, &username, &password).await
        }
        Commands::Logout => commands::auth::logout(&config).await,
        Commands::Whoami => commands::auth::whoami(&config).await,
        Commands::Session => commands::session::show(&config),
        Commands::Request {
            method,
            path,
            data,
            query,
        } => {
            tracing::debug!("Request {} {}", method, path);
            commands::request::run(&config, &method, &path, data.as_deref(), &query).await
        }
    }
}

/// Initialize tracing subscriber
///
/// `RUST_LOG` wins when set; otherwise `blog_client=info`, or `debug` with
/// `--verbose`. Logs go to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "blog_client=debug"
    } else {
        "blog_client=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
