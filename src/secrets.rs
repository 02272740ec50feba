//! Secret values held by the proxy
//!
//! Resolves `env:VAR` references from configuration and wraps the results in
//! types that never print their contents.

use std::{env, fmt};

use subtle::ConstantTimeEq;

/// Resolve a configured secret value.
///
/// Supports a literal value or `env:VAR_NAME`. Returns `None` when the
/// variable is unset or the resolved value is blank.
#[must_use]
pub fn resolve_secret(raw: &str) -> Option<String> {
    let value = match raw.strip_prefix("env:") {
        Some(var_name) => env::var(var_name).ok()?,
        None => raw.to_string(),
    };

    if value.trim().is_empty() { None } else { Some(value) }
}

/// Pre-encoded `client_id:client_secret` pair used for `Basic` auth against
/// the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    /// Wrap an already base64-encoded credential string
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Value for the `Authorization` header of a token request
    #[must_use]
    pub fn basic_header(&self) -> String {
        format!("Basic {}", self.0)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// Static secret the proxy's own callers present as a bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxySecret(String);

impl ProxySecret {
    /// Wrap a proxy secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Check an `Authorization` header value against `Bearer <secret>`.
    ///
    /// The scheme must match exactly; the comparison runs in constant time
    /// over the full header value.
    #[must_use]
    pub fn matches_authorization(&self, header: &str) -> bool {
        let expected = format!("Bearer {}", self.0);
        expected.as_bytes().ct_eq(header.as_bytes()).into()
    }
}

impl fmt::Debug for ProxySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProxySecret(***)")
    }
}
