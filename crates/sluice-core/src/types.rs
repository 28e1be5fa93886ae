//! Shared proxy types

use std::fmt;

/// Username/password pair used for proxy authentication.
///
/// An empty username means authentication is disabled.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials that disable authentication
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether these credentials turn authentication on
    pub fn is_enabled(&self) -> bool {
        !self.username.is_empty()
    }
}

// Passwords stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How outbound connections are established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialMode {
    /// System TCP dial
    Direct,
    /// Dial through the overlay network
    Tunneled,
}

impl DialMode {
    /// Short lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            DialMode::Direct => "direct",
            DialMode::Tunneled => "tunneled",
        }
    }
}

impl fmt::Display for DialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_enabled() {
        assert!(!Credentials::disabled().is_enabled());
        assert!(!Credentials::new("", "secret").is_enabled());
        assert!(Credentials::new("alice", "").is_enabled());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_dial_mode_display() {
        assert_eq!(DialMode::Direct.to_string(), "direct");
        assert_eq!(DialMode::Tunneled.to_string(), "tunneled");
    }
}
