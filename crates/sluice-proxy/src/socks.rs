//! Overlay gateway reached over SOCKS5
//!
//! The overlay network's userspace stack exposes a SOCKS5 ingress. Targets
//! are handed over unresolved so that name resolution happens inside the
//! overlay rather than on the host.

use crate::dialer::{BoxedConnection, OverlayNetwork};
use async_trait::async_trait;
use sluice_core::{Error, Result};
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;

/// SOCKS5 gateway into the overlay network
#[derive(Clone)]
pub struct Socks5Overlay {
    gateway: String,
    credentials: Option<(String, String)>,
}

impl Socks5Overlay {
    /// Gateway at `host:port` without authentication
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            credentials: None,
        }
    }

    /// Authenticate to the gateway with username/password
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Gateway address
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Check that the gateway accepts TCP connections
    ///
    /// Failure here means the overlay is not up; callers treat it as fatal.
    pub async fn probe(&self, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, TcpStream::connect(self.gateway.as_str())).await {
            Ok(Ok(_)) => {
                tracing::debug!(gateway = %self.gateway, "Overlay gateway reachable");
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Startup(format!(
                "overlay gateway {} unreachable: {e}",
                self.gateway
            ))),
            Err(_) => Err(Error::Startup(format!(
                "overlay gateway {} did not accept a connection within {timeout:?}",
                self.gateway
            ))),
        }
    }
}

#[async_trait]
impl OverlayNetwork for Socks5Overlay {
    async fn connect(&self, target: &str) -> io::Result<BoxedConnection> {
        let stream = match &self.credentials {
            Some((username, password)) => {
                Socks5Stream::connect_with_password(
                    self.gateway.as_str(),
                    target,
                    username,
                    password,
                )
                .await
            }
            None => Socks5Stream::connect(self.gateway.as_str(), target).await,
        }
        .map_err(io::Error::other)?;

        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("socks5://{}", self.gateway)
    }
}

impl fmt::Debug for Socks5Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socks5Overlay")
            .field("gateway", &self.gateway)
            .field(
                "username",
                &self.credentials.as_ref().map(|(username, _)| username),
            )
            .finish()
    }
}
