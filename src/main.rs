//! GigaChat Proxy - credential-shielding reverse proxy
//!
//! Holds the upstream credentials server-side and forwards authorized chat
//! requests under a managed access token.

use std::env;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::time::Instant;
use tracing::{error, info};

use gigachat_proxy::{
    cli::{Cli, Command},
    config::Config,
    gateway::Gateway,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Token) => match run_token(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ {e:#}");
                ExitCode::FAILURE
            }
        },
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> gigachat_proxy::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;

    // Hosting platforms commonly hand the listen port over as PORT
    let port = cli
        .port
        .or_else(|| env::var("PORT").ok().and_then(|p| p.parse().ok()));
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host.clone_from(host);
    }

    Ok(config)
}

/// Acquire one token with the configured credentials
async fn run_token(config: Config) -> anyhow::Result<()> {
    let token_url = config.upstream.token_url.clone();
    let gateway = Gateway::new(config).context("Failed to create gateway")?;
    let tokens = gateway
        .token_manager()
        .context("Upstream credentials are not set")?;

    // Always ask the token endpoint, never a cached value
    tokens.invalidate().await;
    let token = tokens
        .access_token()
        .await
        .with_context(|| format!("Token request to {token_url} failed"))?;

    let cached_for = token.expires_at().saturating_duration_since(Instant::now());
    println!("✅ Token acquired from {token_url}");
    println!("   Cached for: {}s", cached_for.as_secs());
    Ok(())
}

/// Run the proxy server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        "Starting GigaChat proxy"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
