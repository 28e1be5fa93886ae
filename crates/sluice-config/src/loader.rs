//! Configuration loading

use crate::types::OverlayConfig;
use crate::{Config, ConfigFormat};
use regex::Regex;
use sluice_core::{Error, Result};
use std::env;
use std::fs;
use std::path::Path;

/// Proxy username
pub const ENV_PROXY_USER: &str = "PROXY_USER";
/// Proxy password
pub const ENV_PROXY_PASS: &str = "PROXY_PASS";
/// Listen port
pub const ENV_PORT: &str = "PORT";
/// Overlay gateway `host:port`
pub const ENV_OVERLAY_SOCKS_ADDR: &str = "OVERLAY_SOCKS_ADDR";
/// Overlay gateway username
pub const ENV_OVERLAY_SOCKS_USER: &str = "OVERLAY_SOCKS_USER";
/// Overlay gateway password
pub const ENV_OVERLAY_SOCKS_PASS: &str = "OVERLAY_SOCKS_PASS";

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match (env::var(var_name), default_value) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                return Err(Error::Config(format!(
                    "Environment variable '{var_name}' not set and no default provided"
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Config> {
    let expanded_content = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(config)
}

/// Apply overrides from the process environment
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_env_overrides_with(config, |key| env::var(key).ok())
}

/// Apply overrides using `lookup` to read variables
///
/// Empty values are treated as unset.
pub fn apply_env_overrides_with<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(username) = get(ENV_PROXY_USER) {
        config.auth.username = username;
    }
    if let Some(password) = get(ENV_PROXY_PASS) {
        config.auth.password = password;
    }

    if let Some(port) = get(ENV_PORT) {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {ENV_PORT} '{port}': {e}")))?;
        config.proxy.listen.set_port(port);
    }

    if let Some(gateway) = get(ENV_OVERLAY_SOCKS_ADDR) {
        match config.overlay.as_mut() {
            Some(overlay) => overlay.gateway = gateway,
            None => config.overlay = Some(OverlayConfig::new(gateway)),
        }
    }

    let overlay_user = get(ENV_OVERLAY_SOCKS_USER);
    let overlay_pass = get(ENV_OVERLAY_SOCKS_PASS);
    match config.overlay.as_mut() {
        Some(overlay) => {
            if overlay_user.is_some() {
                overlay.username = overlay_user;
            }
            if overlay_pass.is_some() {
                overlay.password = overlay_pass;
            }
        }
        None if overlay_user.is_some() || overlay_pass.is_some() => {
            tracing::warn!(
                user_var = ENV_OVERLAY_SOCKS_USER,
                pass_var = ENV_OVERLAY_SOCKS_PASS,
                "Overlay credentials set without an overlay gateway, ignoring"
            );
        }
        None => {}
    }

    Ok(())
}

/// Load configuration: file (or defaults), then environment overrides, then validation
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => Config::default(),
    };

    apply_env_overrides(&mut config)?;

    crate::validator::validate_config(&config)?;

    Ok(config)
}
