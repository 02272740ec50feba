//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::secrets::{Credentials, ProxySecret, resolve_secret};
use crate::token::DEFAULT_EXPIRY_SKEW;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before resolving secrets.
    /// Paths support ~ expansion. Loaded in order; variables already set win.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream endpoints
    pub upstream: UpstreamConfig,
    /// Secret references
    pub secrets: SecretsConfig,
    /// Token cache configuration
    pub token: TokenConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout for the whole inbound request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout: Duration::from_secs(120),
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Upstream endpoints and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// OAuth-style token endpoint
    pub token_url: String,
    /// Chat-completions endpoint
    pub chat_url: String,
    /// Scope requested with every token
    pub scope: String,
    /// Skip TLS certificate validation toward upstream hosts
    pub accept_invalid_certs: bool,
    /// Connect timeout for upstream calls
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Total timeout for a single upstream call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            token_url: "https://ngw.devices.sberbank.ru:9443/api/v2/oauth".to_string(),
            chat_url: "https://gigachat.devices.sberbank.ru/api/v1/chat/completions".to_string(),
            scope: "GIGACHAT_API_PERS".to_string(),
            // GigaChat hosts present certificates from a national CA that is
            // absent from the default trust roots.
            accept_invalid_certs: true,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(90),
        }
    }
}

/// Secret references
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Pre-encoded client credentials for the token endpoint.
    /// Supports a literal value or `env:VAR_NAME`.
    pub credentials: String,
    /// Secret callers must present as `Authorization: Bearer <secret>`.
    /// Supports a literal value or `env:VAR_NAME`.
    pub proxy_secret: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            credentials: "env:GIGA_API_KEY".to_string(),
            proxy_secret: "env:PROXY_SECRET_KEY".to_string(),
        }
    }
}

impl SecretsConfig {
    /// Resolve the token-endpoint credentials, `None` when unset
    #[must_use]
    pub fn resolve_credentials(&self) -> Option<Credentials> {
        resolve_secret(&self.credentials).map(Credentials::new)
    }

    /// Resolve the proxy secret, `None` when unset
    #[must_use]
    pub fn resolve_proxy_secret(&self) -> Option<ProxySecret> {
        resolve_secret(&self.proxy_secret).map(ProxySecret::new)
    }
}

/// Token cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Margin subtracted from the issuer-declared token lifetime
    #[serde(with = "humantime_serde")]
    pub expiry_skew: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            expiry_skew: DEFAULT_EXPIRY_SKEW,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // GIGACHAT_PROXY_SERVER__PORT=9000 etc.
        figment = figment.merge(Env::prefixed("GIGACHAT_PROXY_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }
}

/// Humantime-style serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to a string in seconds (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    /// Deserialize a duration string (e.g., "30s", "5m", "100ms", or bare seconds)
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
