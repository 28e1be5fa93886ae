//! CONNECT tunneling
//!
//! A CONNECT request is answered only after the destination has been dialed.
//! Once the client connection is handed over, the session splices the two
//! streams with one task per direction. Whichever direction finishes first
//! (EOF or error) cancels the other, so a tunnel never outlives either side.

use crate::body::{empty, error_response, ProxyBody};
use crate::dialer::{BoxedConnection, Dialer, DIAL_TIMEOUT};
use http::{Request, Response};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use sluice_core::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Instrument};

const COPY_BUFFER_SIZE: usize = 16 * 1024;

/// Handler for CONNECT requests
#[derive(Debug, Clone)]
pub struct ConnectionTunnel {
    dialer: Dialer,
    dial_timeout: Duration,
}

impl ConnectionTunnel {
    /// Tunnel handler dialing through `dialer`
    pub fn new(dialer: Dialer) -> Self {
        Self {
            dialer,
            dial_timeout: DIAL_TIMEOUT,
        }
    }

    /// Handle a CONNECT request from `peer`
    ///
    /// Returns 500 before dialing when the connection cannot be taken over,
    /// 503 without touching the client connection when the dial fails, and an
    /// empty 200 otherwise. In the last case the tunnel runs on its own task.
    pub async fn handle<B>(&self, mut req: Request<B>, peer: SocketAddr) -> Response<ProxyBody> {
        let target = connect_target(&req);

        if req.extensions().get::<OnUpgrade>().is_none() {
            let err = Error::HijackUnsupported(
                "client connection is not served with upgrade support".to_string(),
            );
            error!(%peer, destination = %target, "{err}");
            return error_response(&err);
        }

        let destination = match self.dialer.dial(&target, self.dial_timeout).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(%peer, destination = %target, error = %e, "CONNECT dial failed");
                return error_response(&e);
            }
        };

        let on_upgrade = hyper::upgrade::on(&mut req);
        let span = tracing::debug_span!("tunnel", %peer, destination = %target);

        tokio::spawn(
            async move {
                match on_upgrade.await {
                    Ok(upgraded) => {
                        let report = TunnelSession::new(TokioIo::new(upgraded), destination)
                            .run()
                            .await;
                        debug!(
                            sent = report.client_to_destination,
                            received = report.destination_to_client,
                            "Tunnel closed"
                        );
                    }
                    Err(e) => warn!(error = %e, "Client connection upgrade failed"),
                }
            }
            .instrument(span),
        );

        Response::new(empty())
    }
}

/// Tunnel target taken from the request-line authority
///
/// The `Host` header is deliberately ignored; an absent authority yields an
/// empty target, which fails at dial time.
pub fn connect_target<B>(req: &Request<B>) -> String {
    req.uri()
        .authority()
        .map(|authority| authority.as_str().to_string())
        .unwrap_or_default()
}

/// Bytes relayed by a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TunnelReport {
    /// Bytes copied from the client to the destination
    pub client_to_destination: u64,
    /// Bytes copied from the destination to the client
    pub destination_to_client: u64,
}

/// A live tunnel between a taken-over client connection and a dialed destination
#[derive(Debug)]
pub struct TunnelSession<C, D = BoxedConnection> {
    client: C,
    destination: D,
}

impl<C, D> TunnelSession<C, D>
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    D: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Pair `client` with `destination`
    pub fn new(client: C, destination: D) -> Self {
        Self {
            client,
            destination,
        }
    }

    /// Relay bytes both ways until either side closes or fails
    ///
    /// Resolves once both directional tasks have terminated.
    pub async fn run(self) -> TunnelReport {
        let (client_read, client_write) = tokio::io::split(self.client);
        let (destination_read, destination_write) = tokio::io::split(self.destination);
        let closed = CancellationToken::new();

        let upstream = tokio::spawn(pipe(
            client_read,
            destination_write,
            closed.clone(),
            Direction::Upstream,
        ));
        let downstream = tokio::spawn(pipe(
            destination_read,
            client_write,
            closed,
            Direction::Downstream,
        ));

        let (upstream, downstream) = tokio::join!(upstream, downstream);

        TunnelReport {
            client_to_destination: joined(upstream, Direction::Upstream),
            destination_to_client: joined(downstream, Direction::Downstream),
        }
    }
}

fn joined(result: Result<u64, tokio::task::JoinError>, direction: Direction) -> u64 {
    result.unwrap_or_else(|e| {
        error!(%direction, error = %e, "Tunnel copy task failed");
        0
    })
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Upstream,
    Downstream,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Upstream => "client->destination",
            Direction::Downstream => "destination->client",
        })
    }
}

/// Copy `reader` into `writer` until EOF, error, or cancellation by the paired task
async fn pipe<R, W>(
    mut reader: R,
    mut writer: W,
    closed: CancellationToken,
    direction: Direction,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;

    loop {
        let n = tokio::select! {
            _ = closed.cancelled() => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(%direction, error = %e, "Tunnel read failed");
                    break;
                }
            },
        };

        tokio::select! {
            _ = closed.cancelled() => break,
            written = writer.write_all(&buf[..n]) => {
                if let Err(e) = written {
                    debug!(%direction, error = %e, "Tunnel write failed");
                    break;
                }
            }
        }

        copied += n as u64;
    }

    // Wake the paired task before closing our write side.
    closed.cancel();
    if let Err(e) = writer.shutdown().await {
        debug!(%direction, error = %e, "Tunnel shutdown failed");
    }

    copied
}
