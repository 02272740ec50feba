//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::auth::ProxySecrets;
use super::forward::{Forwarder, build_http_client};
use super::router::{AppState, create_router};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::token::{HttpTokenSource, TokenManager, TokenSource};
use crate::{Error, Result};

/// GigaChat proxy server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Shared handler state
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a new gateway.
    ///
    /// Missing secrets do not fail construction; every request is answered
    /// with a configuration error instead.
    pub fn new(config: Config) -> Result<Self> {
        let secrets = Arc::new(ProxySecrets::from_config(&config.secrets));

        let forwarder = match secrets.credentials.clone() {
            Some(credentials) => {
                let http_client = build_http_client(&config.upstream)?;
                let source: Arc<dyn TokenSource> = Arc::new(HttpTokenSource::new(
                    http_client.clone(),
                    config.upstream.token_url.clone(),
                    config.upstream.scope.clone(),
                    credentials,
                ));
                let tokens = Arc::new(TokenManager::with_clock(
                    source,
                    Arc::new(SystemClock),
                    config.token.expiry_skew,
                ));
                Some(Arc::new(Forwarder::new(
                    http_client,
                    config.upstream.chat_url.clone(),
                    tokens,
                )))
            }
            None => None,
        };

        Ok(Self {
            config,
            state: Arc::new(AppState { secrets, forwarder }),
        })
    }

    /// Token manager, when upstream credentials are configured
    #[must_use]
    pub fn token_manager(&self) -> Option<Arc<TokenManager>> {
        self.state
            .forwarder
            .as_ref()
            .map(|f| Arc::clone(f.tokens()))
    }

    /// Build the HTTP router
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state), &self.config.server)
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until Ctrl+C or SIGTERM
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;

        info!("============================================================");
        info!("GIGACHAT PROXY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(addr = %local_addr, "Listening");
        info!(chat_url = %self.config.upstream.chat_url, "Forwarding chat requests");
        info!(token_url = %self.config.upstream.token_url, scope = %self.config.upstream.scope, "Token endpoint");

        if self.config.upstream.accept_invalid_certs {
            warn!("TLS certificate validation toward upstream is DISABLED");
        }

        let secrets = &self.state.secrets;
        if secrets.is_complete() {
            info!("Secrets configured");
        } else {
            warn!(
                credentials = secrets.credentials.is_some(),
                proxy_secret = secrets.proxy_secret.is_some(),
                "Secrets missing - every request will fail with a configuration error"
            );
        }
        info!("============================================================");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
