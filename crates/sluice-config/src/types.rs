//! Configuration types

use serde::{Deserialize, Serialize};
use sluice_core::Credentials;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Listener settings
    #[serde(default)]
    pub proxy: ProxySettings,

    /// Proxy authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Overlay network gateway; direct dialing when absent
    #[serde(default)]
    pub overlay: Option<OverlayConfig>,
}

impl Config {
    /// Credentials handed to the proxy engine
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.auth.username, &self.auth.password)
    }

    /// Whether outbound traffic goes through the overlay network
    pub fn is_tunneled(&self) -> bool {
        self.overlay.is_some()
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxySettings {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Graceful shutdown timeout (wait for open connections)
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Proxy authentication. An empty username disables authentication.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    /// Username
    #[serde(default)]
    pub username: String,

    /// Password
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

/// Gateway into the overlay network's userspace stack (SOCKS5 ingress)
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayConfig {
    /// Gateway address as `host:port`
    pub gateway: String,

    /// Gateway username
    #[serde(default)]
    pub username: Option<String>,

    /// Gateway password
    #[serde(default)]
    pub password: Option<String>,

    /// How long startup waits for the gateway to accept a connection
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl OverlayConfig {
    /// Overlay gateway without credentials
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            username: None,
            password: None,
            probe_timeout: default_probe_timeout(),
        }
    }
}

impl fmt::Debug for OverlayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayConfig")
            .field("gateway", &self.gateway)
            .field("username", &self.username)
            .field("password", &self.password.as_deref().map(redacted))
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.proxy.listen.to_string(), "0.0.0.0:8080");
        assert_eq!(config.proxy.shutdown_timeout, Duration::from_secs(30));
        assert!(!config.credentials().is_enabled());
        assert!(!config.is_tunneled());
    }

    #[test]
    fn test_overlay_defaults() {
        let overlay = OverlayConfig::new("10.0.0.1:1080");
        assert_eq!(overlay.probe_timeout, Duration::from_secs(5));
        assert!(overlay.username.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = Config::default();
        config.auth = AuthConfig {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        let mut overlay = OverlayConfig::new("gw:1080");
        overlay.username = Some("wg".to_string());
        overlay.password = Some("s3cret".to_string());
        config.overlay = Some(overlay);

        let debug = format!("{config:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("s3cret"));
    }
}
