//! Forwarder: relays authorized chat requests to the upstream API

use std::sync::Arc;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::UpstreamConfig;
use crate::token::TokenManager;
use crate::{Error, Result};

/// Build the HTTP client shared by the token source and the forwarder
pub fn build_http_client(config: &UpstreamConfig) -> Result<Client> {
    Client::builder()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout)
        .user_agent(concat!("gigachat-proxy/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Sends caller payloads to the chat endpoint under a managed token
pub struct Forwarder {
    http_client: Client,
    chat_url: String,
    tokens: Arc<TokenManager>,
}

impl Forwarder {
    /// Create a forwarder for the given chat endpoint
    #[must_use]
    pub fn new(http_client: Client, chat_url: impl Into<String>, tokens: Arc<TokenManager>) -> Self {
        Self {
            http_client,
            chat_url: chat_url.into(),
            tokens,
        }
    }

    /// Token manager backing this forwarder
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Forward one caller payload.
    ///
    /// Upstream failures come back as `Error::UpstreamApi` with the upstream
    /// status and body untouched.
    pub async fn forward(&self, body: &[u8]) -> Result<Response> {
        let payload: Value = serde_json::from_slice(body)?;
        let token = self.tokens.access_token().await?;

        let upstream = self
            .http_client
            .post(&self.chat_url)
            .bearer_auth(token.value())
            .json(&payload)
            .send()
            .await?;

        let status = upstream.status();
        if !status.is_success() {
            let body = upstream.text().await?;
            error!(%status, body = %body, "Chat API error");
            return Err(Error::UpstreamApi { status, body });
        }

        let data: Value = upstream.json().await?;
        debug!(%status, "Chat API request succeeded");

        Ok((
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            serde_json::to_string(&data)?,
        )
            .into_response())
    }
}
