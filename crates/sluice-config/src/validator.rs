//! Configuration validation

use crate::Config;
use sluice_core::{Error, Result};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_proxy(config)?;

    validate_auth(config)?;

    validate_overlay(config)?;

    Ok(())
}

fn validate_proxy(config: &Config) -> Result<()> {
    if config.proxy.shutdown_timeout.is_zero() {
        return Err(Error::Config("shutdown_timeout must be > 0".to_string()));
    }

    if config.proxy.shutdown_timeout.as_secs() > 300 {
        tracing::warn!("shutdown_timeout is very high (>5 minutes)");
    }

    Ok(())
}

fn validate_auth(config: &Config) -> Result<()> {
    let auth = &config.auth;

    // A lone password would leave the proxy open while looking protected.
    if auth.username.is_empty() && !auth.password.is_empty() {
        return Err(Error::Config(
            "auth password is set but username is empty".to_string(),
        ));
    }

    if !auth.username.is_empty() && auth.password.is_empty() {
        tracing::warn!(
            username = %auth.username,
            "Proxy auth enabled with an empty password"
        );
    }

    if auth.username.contains(':') {
        return Err(Error::Config(
            "auth username cannot contain ':'".to_string(),
        ));
    }

    Ok(())
}

fn validate_overlay(config: &Config) -> Result<()> {
    let Some(overlay) = &config.overlay else {
        return Ok(());
    };

    if overlay.gateway.is_empty() {
        return Err(Error::Config("overlay gateway cannot be empty".to_string()));
    }

    let (host, port) = overlay.gateway.rsplit_once(':').ok_or_else(|| {
        Error::Config(format!(
            "overlay gateway must be host:port, got '{}'",
            overlay.gateway
        ))
    })?;

    if host.is_empty() {
        return Err(Error::Config("overlay gateway host cannot be empty".to_string()));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => {
            return Err(Error::Config(format!(
                "overlay gateway port must be 1-65535, got '{port}'"
            )));
        }
        Ok(_) => {}
    }

    if overlay.username.is_some() != overlay.password.is_some() {
        return Err(Error::Config(
            "overlay username and password must be set together".to_string(),
        ));
    }

    if overlay.probe_timeout.is_zero() {
        return Err(Error::Config("overlay probe_timeout must be > 0".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use std::time::Duration;

    fn minimal_config() -> Config {
        Config {
            proxy: ProxySettings {
                listen: "127.0.0.1:8080".parse().unwrap(),
                shutdown_timeout: Duration::from_secs(30),
            },
            auth: AuthConfig::default(),
            overlay: None,
        }
    }

    #[test]
    fn test_valid_minimal_config() {
        assert!(validate_config(&minimal_config()).is_ok());
    }

    #[test]
    fn test_zero_shutdown_timeout() {
        let mut config = minimal_config();
        config.proxy.shutdown_timeout = Duration::ZERO;

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_password_without_username() {
        let mut config = minimal_config();
        config.auth.password = "secret".to_string();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_username_with_empty_password_allowed() {
        let mut config = minimal_config();
        config.auth.username = "alice".to_string();

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_username_with_colon_rejected() {
        let mut config = minimal_config();
        config.auth.username = "al:ice".to_string();
        config.auth.password = "pw".to_string();

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_overlay_gateway_forms() {
        for (gateway, ok) in [
            ("10.8.0.1:1080", true),
            ("wg-gateway:1080", true),
            ("[fd00::1]:1080", true),
            ("", false),
            ("wg-gateway", false),
            (":1080", false),
            ("wg-gateway:0", false),
            ("wg-gateway:socks", false),
        ] {
            let mut config = minimal_config();
            config.overlay = Some(OverlayConfig::new(gateway));
            assert_eq!(validate_config(&config).is_ok(), ok, "gateway {gateway:?}");
        }
    }

    #[test]
    fn test_overlay_credentials_must_pair() {
        let mut config = minimal_config();
        let mut overlay = OverlayConfig::new("10.8.0.1:1080");
        overlay.username = Some("wg".to_string());
        config.overlay = Some(overlay);

        assert!(validate_config(&config).is_err());
    }
}
