//! Dialer bring-up
//!
//! Chooses the dial mode from configuration. With an overlay configured, the
//! gateway must answer before the proxy starts listening.

use sluice_config::Config;
use sluice_core::Result;
use sluice_proxy::{Dialer, Socks5Overlay};

/// Build the dialer described by `config`
///
/// Fails with [`sluice_core::Error::Startup`] when the overlay gateway is unreachable.
pub async fn build_dialer(config: &Config) -> Result<Dialer> {
    let Some(overlay) = &config.overlay else {
        tracing::info!("No overlay configured, dialing destinations directly");
        return Ok(Dialer::direct());
    };

    let mut network = Socks5Overlay::new(overlay.gateway.as_str());
    if let (Some(username), Some(password)) = (&overlay.username, &overlay.password) {
        network = network.with_credentials(username.as_str(), password.as_str());
    }

    tracing::info!(
        gateway = %overlay.gateway,
        timeout = ?overlay.probe_timeout,
        "Bringing up overlay network"
    );
    network.probe(overlay.probe_timeout).await?;
    tracing::info!(gateway = %overlay.gateway, "Overlay network is up");

    Ok(Dialer::overlay(network))
}
