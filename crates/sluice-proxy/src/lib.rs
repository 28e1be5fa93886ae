//! # Sluice Proxy Engine
//!
//! Forward HTTP/HTTPS proxy engine with:
//! - Pluggable dialers (direct, or through an overlay network)
//! - HTTP Basic proxy authentication
//! - CONNECT tunneling over hijacked client connections
//! - Streaming HTTP forwarding with multi-value header preservation

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod auth;
pub mod body;
pub mod connector;
pub mod dialer;
pub mod forward;
pub mod router;
pub mod socks;
pub mod tunnel;

pub use auth::{authorize, parse_basic, AuthGate, Verdict, CHALLENGE};
pub use body::ProxyBody;
pub use dialer::{BoxedConnection, Dialer, OverlayNetwork, DIAL_TIMEOUT};
pub use forward::HttpForwarder;
pub use router::{Router, RouterBuilder};
pub use socks::Socks5Overlay;
pub use tunnel::{ConnectionTunnel, TunnelReport, TunnelSession};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auth::AuthGate;
    pub use crate::dialer::{Dialer, OverlayNetwork};
    pub use crate::router::Router;
    pub use crate::socks::Socks5Overlay;
    pub use crate::tunnel::{ConnectionTunnel, TunnelReport};
}
