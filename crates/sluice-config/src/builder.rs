//! Configuration builder

use crate::types::{AuthConfig, Config, OverlayConfig, ProxySettings};
use std::net::SocketAddr;
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    proxy: ProxySettings,
    auth: AuthConfig,
    overlay: Option<OverlayConfig>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.proxy.listen = addr;
        self
    }

    /// Set graceful shutdown timeout
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.proxy.shutdown_timeout = timeout;
        self
    }

    /// Require proxy authentication
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = AuthConfig {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Route outbound traffic through an overlay gateway
    pub fn overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> sluice_core::Result<Config> {
        let config = Config {
            proxy: self.proxy,
            auth: self.auth,
            overlay: self.overlay,
        };

        crate::validator::validate_config(&config)?;

        Ok(config)
    }
}
