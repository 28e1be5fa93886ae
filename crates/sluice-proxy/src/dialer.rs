//! Outbound dialers
//!
//! Every outbound connection the proxy makes, for CONNECT tunnels and for
//! forwarded HTTP requests alike, goes through a [`Dialer`]. The dialer is
//! chosen once at startup and shared read-only by all requests.

use async_trait::async_trait;
use sluice_core::{DialMode, Error, Result};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Timeout for establishing outbound connections
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Byte stream returned by a dialer
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Boxed outbound connection
pub type BoxedConnection = Box<dyn Connection>;

/// Handle to an overlay network stack that can open TCP streams inside the overlay
#[async_trait]
pub trait OverlayNetwork: Send + Sync + fmt::Debug {
    /// Open a stream to `target` (`host:port`) through the overlay
    async fn connect(&self, target: &str) -> io::Result<BoxedConnection>;

    /// Human readable description of the overlay endpoint
    fn describe(&self) -> String;
}

/// Outbound connection factory
#[derive(Debug, Clone)]
pub enum Dialer {
    /// System TCP dial
    Direct,
    /// Dial through an overlay network
    Overlay(Arc<dyn OverlayNetwork>),
}

impl Dialer {
    /// Dialer using the host's own network
    pub fn direct() -> Self {
        Dialer::Direct
    }

    /// Dialer routing through `network`
    pub fn overlay(network: impl OverlayNetwork + 'static) -> Self {
        Dialer::Overlay(Arc::new(network))
    }

    /// Dial mode reported by the health endpoint
    pub fn mode(&self) -> DialMode {
        match self {
            Dialer::Direct => DialMode::Direct,
            Dialer::Overlay(_) => DialMode::Tunneled,
        }
    }

    /// Open a connection to `target` (`host:port`) within `timeout`
    pub async fn dial(&self, target: &str, timeout: Duration) -> Result<BoxedConnection> {
        if target.is_empty() {
            return Err(Error::dial(target, "empty target address"));
        }

        let connect = async {
            match self {
                Dialer::Direct => connect_tcp(target).await,
                Dialer::Overlay(network) => network.connect(target).await,
            }
        };

        match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(conn)) => {
                tracing::debug!(destination = target, mode = %self.mode(), "Dialed destination");
                Ok(conn)
            }
            Ok(Err(e)) => Err(Error::dial(target, e)),
            Err(_) => Err(Error::DialTimeout {
                target: target.to_string(),
                timeout,
            }),
        }
    }
}

async fn connect_tcp(target: &str) -> io::Result<BoxedConnection> {
    let stream = TcpStream::connect(target).await?;
    stream.set_nodelay(true)?;
    Ok(Box::new(stream))
}

impl fmt::Display for Dialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialer::Direct => f.write_str("direct"),
            Dialer::Overlay(network) => write!(f, "overlay via {}", network.describe()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Overlay that connects directly but records every target it was asked for
    #[derive(Debug, Default)]
    pub(crate) struct RecordingOverlay {
        pub(crate) targets: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OverlayNetwork for RecordingOverlay {
        async fn connect(&self, target: &str) -> io::Result<BoxedConnection> {
            self.targets.lock().unwrap().push(target.to_string());
            Ok(Box::new(TcpStream::connect(target).await?))
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    #[derive(Debug)]
    struct StalledOverlay;

    #[async_trait]
    impl OverlayNetwork for StalledOverlay {
        async fn connect(&self, _target: &str) -> io::Result<BoxedConnection> {
            std::future::pending().await
        }

        fn describe(&self) -> String {
            "stalled".to_string()
        }
    }

    #[tokio::test]
    async fn test_direct_dial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"hello").await.unwrap();
        });

        let mut conn = Dialer::direct()
            .dial(&addr.to_string(), DIAL_TIMEOUT)
            .await
            .unwrap();
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_direct_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Dialer::direct()
            .dial(&addr.to_string(), DIAL_TIMEOUT)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::DialFailed { .. }));
    }

    #[tokio::test]
    async fn test_empty_target_fails() {
        let err = Dialer::direct().dial("", DIAL_TIMEOUT).await.err().unwrap();
        assert!(err.is_dial_error());
    }

    #[tokio::test]
    async fn test_overlay_receives_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let overlay = Arc::new(RecordingOverlay::default());
        let dialer = Dialer::Overlay(overlay.clone());
        assert_eq!(dialer.mode(), DialMode::Tunneled);

        dialer.dial(&addr, DIAL_TIMEOUT).await.unwrap();
        assert_eq!(*overlay.targets.lock().unwrap(), vec![addr]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_dial_timeout() {
        let dialer = Dialer::overlay(StalledOverlay);

        let err = dialer
            .dial("example.com:443", DIAL_TIMEOUT)
            .await
            .err()
            .unwrap();
        match err {
            Error::DialTimeout { target, timeout } => {
                assert_eq!(target, "example.com:443");
                assert_eq!(timeout, DIAL_TIMEOUT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Dialer::direct().to_string(), "direct");
        assert_eq!(
            Dialer::overlay(StalledOverlay).to_string(),
            "overlay via stalled"
        );
    }
}
