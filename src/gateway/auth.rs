//! Inbound gatekeeper
//!
//! Every non-preflight request must:
//! - arrive while both the upstream credentials and the proxy secret are configured
//! - use `POST`
//! - carry `Authorization: Bearer <proxy secret>`

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::config::SecretsConfig;
use crate::secrets::{Credentials, ProxySecret};
use crate::{Error, Result};

/// Secrets resolved from configuration. Either may be missing.
#[derive(Debug, Clone, Default)]
pub struct ProxySecrets {
    /// Client credentials for the token endpoint
    pub credentials: Option<Credentials>,
    /// Secret the proxy's callers must present
    pub proxy_secret: Option<ProxySecret>,
}

/// Marker inserted into request extensions once the gatekeeper admits a request
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

impl ProxySecrets {
    /// Resolve both secrets from configuration
    #[must_use]
    pub fn from_config(config: &SecretsConfig) -> Self {
        Self {
            credentials: config.resolve_credentials(),
            proxy_secret: config.resolve_proxy_secret(),
        }
    }

    /// Whether both secrets are present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.credentials.is_some() && self.proxy_secret.is_some()
    }

    /// Decide whether a request may be forwarded.
    ///
    /// Missing secrets are reported before anything about the request itself.
    pub fn authorize(&self, method: &Method, headers: &HeaderMap) -> Result<Authorized> {
        if self.credentials.is_none() {
            return Err(Error::Config("upstream credentials are not set".to_string()));
        }
        let Some(proxy_secret) = self.proxy_secret.as_ref() else {
            return Err(Error::Config("proxy secret is not set".to_string()));
        };

        if method != Method::POST {
            return Err(Error::Unauthorized(format!("method {method} is not allowed")));
        }

        let header = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match header {
            Some(value) if proxy_secret.matches_authorization(value) => Ok(Authorized),
            Some(_) => Err(Error::Unauthorized("invalid proxy secret".to_string())),
            None => Err(Error::Unauthorized(
                "missing Authorization header".to_string(),
            )),
        }
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(secrets): State<Arc<ProxySecrets>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    match secrets.authorize(request.method(), request.headers()) {
        Ok(authorized) => {
            debug!(path = %path, "Authenticated request");
            request.extensions_mut().insert(authorized);
            next.run(request).await
        }
        Err(e) => {
            if let Error::Unauthorized(ref reason) = e {
                warn!(path = %path, method = %request.method(), %reason, "Rejected request");
            }
            e.into_response()
        }
    }
}
