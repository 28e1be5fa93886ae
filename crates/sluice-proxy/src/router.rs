//! Request routing
//!
//! Every request passes the auth gate first. Authorized requests are then
//! dispatched on method and target: CONNECT opens a tunnel, an origin-form
//! `GET /` answers the health check, everything else is forwarded.

use crate::auth::AuthGate;
use crate::body::{error_response, text_response, ProxyBody};
use crate::dialer::{Dialer, DIAL_TIMEOUT};
use crate::forward::HttpForwarder;
use crate::tunnel::ConnectionTunnel;
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use sluice_core::{Credentials, DialMode, Error};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Entry point for every request reaching the proxy
#[derive(Debug, Clone)]
pub struct Router {
    auth: AuthGate,
    tunnel: Option<ConnectionTunnel>,
    forwarder: HttpForwarder,
    health_text: String,
}

impl Router {
    /// Create a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Whether requests must carry proxy credentials
    pub fn auth_enabled(&self) -> bool {
        self.auth.is_enabled()
    }

    /// Route `req` received from `peer`
    ///
    /// Never fails: every outcome, errors included, is a response.
    pub async fn handle<B>(
        &self,
        req: Request<B>,
        peer: SocketAddr,
    ) -> Result<Response<ProxyBody>, Infallible>
    where
        B: hyper::body::Body<Data = Bytes, Error = hyper::Error> + Send + Sync + 'static,
    {
        if !self.auth.check(req.headers()).is_allowed() {
            warn!(
                %peer,
                method = %req.method(),
                uri = %req.uri(),
                "Unauthorized proxy attempt"
            );
            return Ok(error_response(&Error::AuthDenied));
        }

        if req.method() == Method::CONNECT {
            return Ok(self.connect(req, peer).await);
        }

        if is_health_check(&req) {
            debug!(%peer, "Health check");
            return Ok(text_response(StatusCode::OK, self.health_text.clone()));
        }

        info!(%peer, method = %req.method(), uri = %req.uri(), "Forwarding request");
        let req = req.map(|body| body.boxed());
        Ok(self.forwarder.handle(req).await)
    }

    async fn connect<B>(&self, req: Request<B>, peer: SocketAddr) -> Response<ProxyBody> {
        match &self.tunnel {
            Some(tunnel) => {
                info!(%peer, destination = %req.uri(), "Opening tunnel");
                tunnel.handle(req, peer).await
            }
            None => {
                let err =
                    Error::HijackUnsupported("CONNECT is not enabled on this router".to_string());
                tracing::error!(%peer, destination = %req.uri(), "{err}");
                error_response(&err)
            }
        }
    }
}

/// `GET /` addressed to the proxy itself, not an absolute-form proxy request
fn is_health_check<B>(req: &Request<B>) -> bool {
    req.method() == Method::GET && req.uri().authority().is_none() && req.uri().path() == "/"
}

fn health_text(mode: DialMode) -> String {
    match mode {
        DialMode::Tunneled => format!("Proxy running in {mode} mode via overlay network"),
        DialMode::Direct => format!("Proxy running in {mode} mode (no overlay)"),
    }
}

/// Builder for [`Router`]
#[derive(Debug)]
pub struct RouterBuilder {
    dialer: Dialer,
    credentials: Credentials,
    connect_tunneling: bool,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self {
            dialer: Dialer::direct(),
            credentials: Credentials::disabled(),
            connect_tunneling: true,
        }
    }
}

impl RouterBuilder {
    /// Dialer used for tunnels and forwarded requests
    pub fn dialer(mut self, dialer: Dialer) -> Self {
        self.dialer = dialer;
        self
    }

    /// Credentials every request must present; an empty username disables auth
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Whether CONNECT requests are served
    ///
    /// Only enable when the serving stack hands connections over on upgrade.
    pub fn connect_tunneling(mut self, enabled: bool) -> Self {
        self.connect_tunneling = enabled;
        self
    }

    /// Build the router
    pub fn build(self) -> Router {
        let tunnel = self
            .connect_tunneling
            .then(|| ConnectionTunnel::new(self.dialer.clone()));

        Router {
            auth: AuthGate::new(self.credentials),
            tunnel,
            forwarder: HttpForwarder::new(self.dialer.clone(), DIAL_TIMEOUT),
            health_text: health_text(self.dialer.mode()),
        }
    }
}
