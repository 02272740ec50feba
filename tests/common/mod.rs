//! In-process mock of the upstream token and chat endpoints

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use gigachat_proxy::config::{Config, SecretsConfig};
use gigachat_proxy::gateway::Gateway;
use gigachat_proxy::token::TokenManager;

/// Base64 of `client:secret`
pub const CREDENTIALS: &str = "Y2xpZW50OnNlY3JldA==";
pub const PROXY_SECRET: &str = "proxy-secret";

/// A request as seen by the mock upstream
#[derive(Debug, Clone)]
pub struct Captured {
    pub headers: HeaderMap,
    pub body: String,
}

/// Mock upstream state
pub struct Upstream {
    pub token_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub token_requests: Mutex<Vec<Captured>>,
    pub chat_requests: Mutex<Vec<Captured>>,
    /// Lifetime reported in every token response
    pub token_expires_in: AtomicU64,
    /// When set, the token endpoint answers with this status and body
    pub token_failure: Mutex<Option<(StatusCode, String)>>,
    /// Status and body the chat endpoint answers with
    pub chat_reply: Mutex<(StatusCode, String)>,
    /// Delay before the chat endpoint answers
    pub chat_delay: Mutex<Option<Duration>>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            token_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            token_requests: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            token_expires_in: AtomicU64::new(1800),
            token_failure: Mutex::new(None),
            chat_reply: Mutex::new((
                StatusCode::OK,
                r#"{"choices":[{"message":{"role":"assistant","content":"Hi"}}]}"#.to_string(),
            )),
            chat_delay: Mutex::new(None),
        }
    }
}

impl Upstream {
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn set_chat_reply(&self, status: StatusCode, body: &str) {
        *self.chat_reply.lock() = (status, body.to_string());
    }

    pub fn fail_tokens(&self, status: StatusCode, body: &str) {
        *self.token_failure.lock() = Some((status, body.to_string()));
    }
}

async fn token_handler(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let n = upstream.token_calls.fetch_add(1, Ordering::SeqCst);
    upstream.token_requests.lock().push(Captured { headers, body });

    if let Some((status, body)) = upstream.token_failure.lock().clone() {
        return (status, body).into_response();
    }

    let expires_in = upstream.token_expires_in.load(Ordering::SeqCst);
    (
        [(header::CONTENT_TYPE, "application/json")],
        format!(r#"{{"access_token":"tok-{n}","expires_in":{expires_in}}}"#),
    )
        .into_response()
}

async fn chat_handler(
    State(upstream): State<Arc<Upstream>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    upstream.chat_calls.fetch_add(1, Ordering::SeqCst);
    upstream.chat_requests.lock().push(Captured { headers, body });

    let delay = *upstream.chat_delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let (status, body) = upstream.chat_reply.lock().clone();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Start the mock upstream and return its address
pub async fn spawn_upstream() -> (Arc<Upstream>, SocketAddr) {
    let upstream = Arc::new(Upstream::default());
    let router = Router::new()
        .route("/api/v2/oauth", post(token_handler))
        .route("/api/v1/chat/completions", post(chat_handler))
        .with_state(Arc::clone(&upstream));
    let addr = spawn(router).await;
    (upstream, addr)
}

/// Proxy configuration pointing at the mock upstream
pub fn proxy_config(upstream: SocketAddr) -> Config {
    let mut config = Config {
        secrets: SecretsConfig {
            credentials: CREDENTIALS.to_string(),
            proxy_secret: PROXY_SECRET.to_string(),
        },
        ..Config::default()
    };
    config.upstream.token_url = format!("http://{upstream}/api/v2/oauth");
    config.upstream.chat_url = format!("http://{upstream}/api/v1/chat/completions");
    config.upstream.accept_invalid_certs = false;
    config
}

/// Running proxy under test
pub struct Proxy {
    pub base_url: String,
    pub tokens: Option<Arc<TokenManager>>,
    pub client: reqwest::Client,
}

impl Proxy {
    /// `POST /` with the correct proxy secret
    pub async fn chat(&self, body: &str) -> reqwest::Response {
        self.client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {PROXY_SECRET}"))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }
}

/// Start a proxy with the given configuration
pub async fn spawn_proxy(config: Config) -> Proxy {
    let gateway = Gateway::new(config).unwrap();
    let tokens = gateway.token_manager();
    let addr = spawn(gateway.router()).await;
    Proxy {
        base_url: format!("http://{addr}/"),
        tokens,
        client: reqwest::Client::new(),
    }
}

/// Mock upstream plus a proxy in front of it
pub async fn setup() -> (Arc<Upstream>, Proxy) {
    let (upstream, addr) = spawn_upstream().await;
    let proxy = spawn_proxy(proxy_config(addr)).await;
    (upstream, proxy)
}
