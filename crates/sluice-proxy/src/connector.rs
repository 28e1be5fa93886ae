//! Connector binding the forwarding client to the active [`Dialer`]

use crate::dialer::{BoxedConnection, Dialer};
use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use sluice_core::{Error, Result};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// `tower::Service<Uri>` that opens origin connections through a [`Dialer`]
#[derive(Debug, Clone)]
pub struct DialerConnector {
    dialer: Dialer,
    timeout: Duration,
}

impl DialerConnector {
    /// Connector dialing through `dialer` with `timeout` per connection
    pub fn new(dialer: Dialer, timeout: Duration) -> Self {
        Self { dialer, timeout }
    }
}

impl tower::Service<Uri> for DialerConnector {
    type Response = DialedStream;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<DialedStream>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dialer = self.dialer.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let target = origin_target(&uri)?;
            let conn = dialer.dial(&target, timeout).await?;
            Ok(DialedStream::new(conn))
        })
    }
}

/// `host:port` to dial for an origin URI
///
/// Only plain `http` origins are dialed here; TLS origins are reached with CONNECT.
pub fn origin_target(uri: &Uri) -> Result<String> {
    let port = match uri.scheme_str() {
        Some("http") | None => 80,
        Some("https") => {
            return Err(Error::Upstream(format!(
                "refusing to originate TLS to {uri}; use CONNECT for https"
            )))
        }
        Some(other) => {
            return Err(Error::Upstream(format!("unsupported scheme '{other}'")));
        }
    };

    let host = uri
        .host()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::Upstream(format!("no host in request URL '{uri}'")))?;

    Ok(format!("{}:{}", host, uri.port_u16().unwrap_or(port)))
}

/// Dialed origin connection, adapted to hyper's I/O traits
pub struct DialedStream {
    io: TokioIo<BoxedConnection>,
}

impl DialedStream {
    fn new(conn: BoxedConnection) -> Self {
        Self {
            io: TokioIo::new(conn),
        }
    }
}

impl std::fmt::Debug for DialedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialedStream").finish_non_exhaustive()
    }
}

impl Connection for DialedStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl Read for DialedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_read(cx, buf)
    }
}

impl Write for DialedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_target() {
        let target = |uri: &str| origin_target(&uri.parse().unwrap());

        assert_eq!(target("http://example.com/path").unwrap(), "example.com:80");
        assert_eq!(target("http://example.com:8080/").unwrap(), "example.com:8080");
        assert_eq!(target("http://[::1]:8080/").unwrap(), "[::1]:8080");
        assert!(target("https://example.com/").is_err());
        assert!(target("/relative").is_err());
    }
}
