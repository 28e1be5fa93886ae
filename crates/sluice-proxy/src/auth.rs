//! Proxy authentication gate
//!
//! HTTP Basic credentials are read from `Proxy-Authorization`, falling back to
//! `Authorization` when the former is absent. The gate only decides; sending
//! the 407 challenge is the caller's job.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{AUTHORIZATION, PROXY_AUTHORIZATION};
use http::{HeaderMap, HeaderValue};
use sluice_core::Credentials;

/// Value of the `Proxy-Authenticate` challenge sent with 407 responses
pub const CHALLENGE: &str = "Basic realm=\"Proxy\"";

/// Authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Request may proceed
    Allow,
    /// Request must be rejected with 407
    Deny,
}

impl Verdict {
    /// Whether the request may proceed
    pub fn is_allowed(self) -> bool {
        self == Verdict::Allow
    }
}

/// Decide whether `presented` credentials satisfy `configured` ones
///
/// An empty configured username disables authentication entirely.
pub fn authorize(configured: &Credentials, presented: Option<&Credentials>) -> Verdict {
    if !configured.is_enabled() {
        return Verdict::Allow;
    }

    match presented {
        Some(presented)
            if presented.username == configured.username
                && presented.password == configured.password =>
        {
            Verdict::Allow
        }
        _ => Verdict::Deny,
    }
}

/// Parse a `Basic <base64(user:pass)>` header value
///
/// Returns `None` for any other scheme or a malformed payload.
pub fn parse_basic(value: &HeaderValue) -> Option<Credentials> {
    let value = value.to_str().ok()?.trim();
    let (scheme, payload) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(payload.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials::new(username, password))
}

/// Credentials presented by a request, if any
pub fn presented_credentials(headers: &HeaderMap) -> Option<Credentials> {
    headers
        .get(PROXY_AUTHORIZATION)
        .or_else(|| headers.get(AUTHORIZATION))
        .and_then(parse_basic)
}

/// Stateless authorization check bound to the configured credentials
#[derive(Debug, Clone)]
pub struct AuthGate {
    configured: Credentials,
}

impl AuthGate {
    /// Gate for `configured` credentials
    pub fn new(configured: Credentials) -> Self {
        Self { configured }
    }

    /// Gate that lets everything through
    pub fn disabled() -> Self {
        Self::new(Credentials::disabled())
    }

    /// Whether credentials are required
    pub fn is_enabled(&self) -> bool {
        self.configured.is_enabled()
    }

    /// Check the credentials carried by `headers`
    pub fn check(&self, headers: &HeaderMap) -> Verdict {
        if !self.is_enabled() {
            return Verdict::Allow;
        }
        authorize(&self.configured, presented_credentials(headers).as_ref())
    }
}
