//! Proxy server

use crate::shutdown::ShutdownSignal;
use crate::RuntimeState;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use sluice_config::Config;
use sluice_core::{Error, Result};
use sluice_proxy::{Dialer, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Forward proxy server
#[derive(Debug)]
pub struct Server {
    config: Config,
    dialer: Dialer,
    router: Arc<Router>,
    state: Arc<RwLock<RuntimeState>>,
    shutdown: ShutdownSignal,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server builder
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Get the current state
    pub async fn state(&self) -> RuntimeState {
        *self.state.read().await
    }

    /// Configured listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.config.proxy.listen
    }

    /// Client connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.listen_addr()).await.map_err(|e| {
            Error::Startup(format!("Failed to bind to {}: {}", self.listen_addr(), e))
        })?;

        self.serve(listener).await
    }

    /// Serve connections from `listener` until shutdown, then drain
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        self.set_state(RuntimeState::Running).await;

        tracing::info!(listen = %local_addr, port = local_addr.port(), "Starting proxy server");
        if self.router.auth_enabled() {
            tracing::info!(username = %self.config.auth.username, "Authentication enabled");
        } else {
            tracing::info!("Authentication disabled");
        }
        tracing::info!(mode = %self.dialer.mode(), dialer = %self.dialer, "Dial mode");
        tracing::info!("Proxy server ready");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            tracing::trace!("Accepted connection from {}", peer);
                            self.spawn_connection(stream, peer);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = self.shutdown.triggered() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        drop(listener);
        self.set_state(RuntimeState::ShuttingDown).await;
        self.drain().await;
        self.set_state(RuntimeState::Stopped).await;

        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let router = Arc::clone(&self.router);
        let shutdown = self.shutdown.clone();
        let guard = ConnectionGuard::new(Arc::clone(&self.active_connections));

        tokio::spawn(async move {
            let _guard = guard;
            let service = service_fn(move |req| {
                let router = Arc::clone(&router);
                async move { router.handle(req, peer).await }
            });

            let conn = http1::Builder::new()
                .preserve_header_case(true)
                .title_case_headers(true)
                .serve_connection(TokioIo::new(stream), service)
                .with_upgrades();
            tokio::pin!(conn);

            // On shutdown, idle keep-alive connections close at once and busy
            // ones close after their in-flight response.
            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.triggered() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };

            if let Err(e) = result {
                tracing::debug!(%peer, error = %e, "Connection ended with error");
            }
        });
    }

    /// Wait for open connections to finish, up to the shutdown timeout
    async fn drain(&self) {
        let shutdown_timeout = self.config.proxy.shutdown_timeout;
        let start = tokio::time::Instant::now();

        tracing::info!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Waiting for open connections to complete"
        );

        loop {
            let active = self.active_connections();

            if active == 0 {
                tracing::info!("All connections completed, shutting down cleanly");
                break;
            }

            if start.elapsed() >= shutdown_timeout {
                tracing::warn!(
                    active_connections = active,
                    "Shutdown timeout reached, forcing shutdown"
                );
                break;
            }

            tracing::debug!(
                active_connections = active,
                elapsed_ms = start.elapsed().as_millis(),
                "Waiting for open connections to complete"
            );
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        tracing::info!(
            shutdown_duration_ms = start.elapsed().as_millis(),
            "Server stopped"
        );
    }

    async fn set_state(&self, state: RuntimeState) {
        *self.state.write().await = state;
    }
}

/// Counts a served connection for as long as it is alive
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self { active }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Server builder
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: Option<Config>,
    dialer: Option<Dialer>,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the dialer for tunnels and forwarded requests; defaults to direct dialing
    pub fn dialer(mut self, dialer: Dialer) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Build the server
    pub fn build(self) -> Result<Server> {
        let config = self
            .config
            .ok_or_else(|| Error::Config("config is required".to_string()))?;
        let dialer = self.dialer.unwrap_or_else(Dialer::direct);

        let router = Router::builder()
            .dialer(dialer.clone())
            .credentials(config.credentials())
            .connect_tunneling(true)
            .build();

        Ok(Server {
            config,
            dialer,
            router: Arc::new(router),
            state: Arc::new(RwLock::new(RuntimeState::Initializing)),
            shutdown: ShutdownSignal::new(),
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_requires_config() {
        let err = Server::builder().build().err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_initial_state() {
        let server = Server::builder().config(Config::default()).build().unwrap();

        assert_eq!(server.state().await, RuntimeState::Initializing);
        assert_eq!(server.active_connections(), 0);
        assert_eq!(server.listen_addr().port(), 8080);
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = Arc::new(Server::builder().config(Config::default()).build().unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = Arc::clone(&server);
        let handle = tokio::spawn(async move { running.serve(listener).await });

        server.shutdown_signal().trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(server.state().await, RuntimeState::Stopped);
    }
}
