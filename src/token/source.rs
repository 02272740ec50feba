//! Token endpoint client

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::secrets::Credentials;
use crate::{Error, Result};

/// Token endpoint response body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for the chat endpoint
    pub access_token: String,
    /// Issuer-declared lifetime in seconds
    pub expires_in: u64,
}

/// Something that can mint a fresh upstream token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Request a new token. Never consults any cache.
    async fn fetch_token(&self) -> Result<TokenResponse>;
}

/// Fetches tokens over HTTP with client-credential `Basic` auth.
pub struct HttpTokenSource {
    http_client: Client,
    token_url: String,
    scope: String,
    credentials: Credentials,
}

impl HttpTokenSource {
    /// Create a token source for the given endpoint
    #[must_use]
    pub fn new(
        http_client: Client,
        token_url: impl Into<String>,
        scope: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http_client,
            token_url: token_url.into(),
            scope: scope.into(),
            credentials,
        }
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch_token(&self) -> Result<TokenResponse> {
        let rq_uid = Uuid::new_v4();
        debug!(%rq_uid, url = %self.token_url, "Requesting access token");

        let response = self
            .http_client
            .post(&self.token_url)
            .header(header::AUTHORIZATION, self.credentials.basic_header())
            .header(header::ACCEPT, "application/json")
            .header("RqUID", rq_uid.to_string())
            .form(&[("scope", self.scope.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%rq_uid, %status, "Token endpoint rejected the request");
            return Err(Error::UpstreamAuth { status, body });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token)
    }
}
