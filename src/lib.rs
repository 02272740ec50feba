//! GigaChat Proxy Library
//!
//! Credential-shielding reverse proxy for the GigaChat chat-completions API.
//!
//! # Features
//!
//! - **Token management**: short-lived upstream tokens acquired with client
//!   credentials, cached with an expiry skew, refreshed single-flight
//! - **Gatekeeping**: callers authenticate with a separate static proxy secret
//! - **Transparent relay**: JSON payloads and upstream errors pass through as-is
//! - **CORS**: preflight requests are answered without authentication

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod secrets;
pub mod token;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))?,
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(format!("Failed to install subscriber: {e}")))?,
    }

    Ok(())
}
