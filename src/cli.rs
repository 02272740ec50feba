//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Credential-shielding reverse proxy for the GigaChat API
#[derive(Parser, Debug)]
#[command(name = "gigachat-proxy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "GIGACHAT_PROXY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on (falls back to `PORT`)
    #[arg(short, long, env = "GIGACHAT_PROXY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "GIGACHAT_PROXY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "GIGACHAT_PROXY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "GIGACHAT_PROXY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the proxy server (default)
    Serve,

    /// Acquire one upstream token to verify the configured credentials
    Token,
}
