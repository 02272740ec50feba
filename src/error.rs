//! Error types for the GigaChat proxy

use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Result type alias for the proxy
pub type Result<T> = std::result::Result<T, Error>;

/// Proxy errors
#[derive(Error, Debug)]
pub enum Error {
    /// Required secret missing from configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller used a wrong method or did not present the proxy secret
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token endpoint answered with a non-success status
    #[error("Token request failed: HTTP {status} - {body}")]
    UpstreamAuth {
        /// Upstream status code
        status: StatusCode,
        /// Upstream response body
        body: String,
    },

    /// Chat endpoint answered with a non-success status
    #[error("Upstream API error: HTTP {status} - {body}")]
    UpstreamApi {
        /// Upstream status code
        status: StatusCode,
        /// Upstream response body
        body: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// HTTP status reported to the caller for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UpstreamApi { status, .. } => *status,
            Self::Config(_)
            | Self::UpstreamAuth { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Copy of this error for another caller.
    ///
    /// Variants wrapping non-cloneable sources become `Internal` with the same
    /// message, which keeps the status and body reported to callers.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Config(reason) => Self::Config(reason.clone()),
            Self::Unauthorized(reason) => Self::Unauthorized(reason.clone()),
            Self::UpstreamAuth { status, body } => Self::UpstreamAuth {
                status: *status,
                body: body.clone(),
            },
            Self::UpstreamApi { status, body } => Self::UpstreamApi {
                status: *status,
                body: body.clone(),
            },
            Self::Internal(message) => Self::Internal(message.clone()),
            other @ (Self::Io(_) | Self::Json(_) | Self::Http(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }

    /// Plain-text body reported to the caller for this error
    #[must_use]
    pub fn response_body(&self) -> String {
        match self {
            Self::Config(_) => "Server configuration error.".to_string(),
            Self::Unauthorized(_) => "Unauthorized.".to_string(),
            Self::UpstreamAuth { body, .. } | Self::UpstreamApi { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Config(reason) => error!(%reason, "Server configuration error"),
            Self::Unauthorized(_) | Self::UpstreamApi { .. } => {}
            other => error!(error = %other, "Proxy internal error"),
        }
        (status, self.response_body()).into_response()
    }
}
