//! Cached access token with single-flight refresh

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::source::TokenSource;
use crate::clock::{Clock, SystemClock};
use crate::{Error, Result};

/// Safety margin subtracted from the issuer-declared lifetime
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Upper bound on how long a token is served from cache
pub const MAX_CACHED_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Upstream bearer token and the instant it stops being served from cache
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// Create a token that is served until `expires_at`
    pub fn new(value: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Raw token value for the `Authorization` header
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Instant after which the token is refreshed
    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether the token may still be served at `now`
    #[must_use]
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Owns the process-wide upstream token.
///
/// The cache lock is held for the whole refresh, so callers that find the
/// token expired queue behind a single outbound request and then reuse its
/// result, failures included. A failed refresh leaves the cached token
/// untouched; an expired token is never handed out.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use gigachat_proxy::Result;
/// use gigachat_proxy::token::{TokenManager, TokenResponse, TokenSource};
///
/// struct Fixed;
///
/// #[async_trait]
/// impl TokenSource for Fixed {
///     async fn fetch_token(&self) -> Result<TokenResponse> {
///         Ok(TokenResponse {
///             access_token: "abc".to_string(),
///             expires_in: 1800,
///         })
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let tokens = TokenManager::new(Arc::new(Fixed));
/// let token = tokens.access_token().await.unwrap();
/// assert_eq!(token.value(), "abc");
/// # });
/// ```
pub struct TokenManager {
    source: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    expiry_skew: Duration,
    /// Completed refresh attempts, successful or not
    rounds: AtomicU64,
    cached: Mutex<Cache>,
}

#[derive(Default)]
struct Cache {
    token: Option<AccessToken>,
    /// Outcome of the latest refresh when it failed
    last_failure: Option<Error>,
}

impl TokenManager {
    /// Create a manager on the system clock with the default skew
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), DEFAULT_EXPIRY_SKEW)
    }

    /// Create a manager with an explicit clock and expiry skew
    pub fn with_clock(
        source: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
        expiry_skew: Duration,
    ) -> Self {
        Self {
            source,
            clock,
            expiry_skew,
            rounds: AtomicU64::new(0),
            cached: Mutex::new(Cache::default()),
        }
    }

    /// Return a token that is valid now, refreshing it if needed.
    ///
    /// Callers that queue behind a refresh receive its outcome. When that
    /// refresh failed they get a copy of its error instead of issuing another
    /// token request; callers arriving afterwards retry.
    ///
    /// # Errors
    ///
    /// Returns the token source's error (typically `Error::UpstreamAuth` or a
    /// transport error) when a refresh is required and fails.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let observed_round = self.rounds.load(Ordering::Acquire);
        let mut cache = self.cached.lock().await;

        let now = self.clock.now();
        if let Some(token) = cache.token.as_ref().filter(|t| t.is_valid_at(now)) {
            debug!("Access token cache hit");
            return Ok(token.clone());
        }

        if self.rounds.load(Ordering::Acquire) != observed_round
            && let Some(failure) = cache.last_failure.as_ref()
        {
            debug!("Sharing failed refresh with queued caller");
            return Err(failure.duplicate());
        }

        let had_token = cache.token.is_some();
        let fetched = self.source.fetch_token().await;
        self.rounds.fetch_add(1, Ordering::AcqRel);

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, had_token, "Access token refresh failed");
                cache.last_failure = Some(e.duplicate());
                return Err(e);
            }
        };

        // Lifetimes shorter than the skew yield a token that is used once
        // and refreshed on the next request.
        let lifetime = Duration::from_secs(response.expires_in)
            .saturating_sub(self.expiry_skew)
            .min(MAX_CACHED_LIFETIME);
        let expires_at = now
            .checked_add(lifetime)
            .ok_or_else(|| Error::Internal("token expiry is out of range".to_string()))?;
        let token = AccessToken::new(response.access_token, expires_at);
        cache.token = Some(token.clone());
        cache.last_failure = None;

        info!(
            expires_in_secs = response.expires_in,
            cached_for_secs = lifetime.as_secs(),
            refreshed = had_token,
            "Access token acquired"
        );
        Ok(token)
    }

    /// Snapshot of the cached token, valid or not
    pub async fn cached_token(&self) -> Option<AccessToken> {
        self.cached.lock().await.token.clone()
    }

    /// Drop the cached token so the next call refreshes
    pub async fn invalidate(&self) {
        let mut cache = self.cached.lock().await;
        cache.token = None;
        cache.last_failure = None;
    }
}
