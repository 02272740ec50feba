//! HTTP router and handler

use std::sync::Arc;

use axum::{
    Extension, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::Response,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::auth::{Authorized, ProxySecrets, auth_middleware};
use super::forward::Forwarder;
use super::preflight::preflight_middleware;
use crate::config::ServerConfig;
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Resolved secrets checked on every request
    pub secrets: Arc<ProxySecrets>,
    /// Forwarder, absent when no upstream credentials are configured
    pub forwarder: Option<Arc<Forwarder>>,
}

/// Create the router.
///
/// Every path is handled. Layer order, outermost first: request id, tracing,
/// panic catching, timeout, body limit, preflight, gatekeeper.
pub fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let secrets = Arc::clone(&state.secrets);

    Router::new()
        .fallback(proxy_handler)
        .layer(middleware::from_fn_with_state(secrets, auth_middleware))
        .layer(middleware::from_fn(preflight_middleware))
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            server.request_timeout,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Forward an authorized request upstream
async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    Extension(_): Extension<Authorized>,
    body: Bytes,
) -> Result<Response> {
    let forwarder = state
        .forwarder
        .as_ref()
        .ok_or_else(|| Error::Config("upstream credentials are not set".to_string()))?;

    forwarder.forward(&body).await
}
