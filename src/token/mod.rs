//! Upstream access-token lifecycle
//!
//! Acquires short-lived bearer tokens from the OAuth-style token endpoint,
//! caches them with an expiry skew, and coalesces concurrent refreshes.

mod manager;
mod source;

pub use manager::{AccessToken, DEFAULT_EXPIRY_SKEW, TokenManager};
pub use source::{HttpTokenSource, TokenResponse, TokenSource};
