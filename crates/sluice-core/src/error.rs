//! Error types for the sluice proxy

use std::time::Duration;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for the proxy
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or wrong proxy credentials
    #[error("Proxy authentication required")]
    AuthDenied,

    /// Outbound connection could not be established
    #[error("Failed to dial {target}: {reason}")]
    DialFailed {
        /// Requested `host:port`
        target: String,
        /// Underlying cause
        reason: String,
    },

    /// Outbound connection was not established in time
    #[error("Dial to {target} timed out after {timeout:?}")]
    DialTimeout {
        /// Requested `host:port`
        target: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// The serving stack cannot hand over the raw client connection
    #[error("Connection hijacking not supported: {0}")]
    HijackUnsupported(String),

    /// Forwarded round trip failed
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup failure (dialer construction, overlay bring-up, bind)
    #[error("Startup error: {0}")]
    Startup(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::AuthDenied => StatusCode::PROXY_AUTHENTICATION_REQUIRED,
            Error::DialFailed { .. } | Error::DialTimeout { .. } | Error::Upstream(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a dial failure for `target`
    pub fn dial(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::DialFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error happened while establishing an outbound connection
    pub fn is_dial_error(&self) -> bool {
        matches!(self, Error::DialFailed { .. } | Error::DialTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::AuthDenied.to_status_code(),
            StatusCode::PROXY_AUTHENTICATION_REQUIRED
        );
        assert_eq!(
            Error::dial("example.com:443", "connection refused").to_status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::DialTimeout {
                target: "10.0.0.1:80".to_string(),
                timeout: Duration::from_secs(10),
            }
            .to_status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::HijackUnsupported("no upgrade".to_string()).to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Upstream("reset".to_string()).to_status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::Config("bad".to_string()).to_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_dial_error_message() {
        let err = Error::dial("example.com:443", "connection refused");
        assert!(err.is_dial_error());
        assert_eq!(
            err.to_string(),
            "Failed to dial example.com:443: connection refused"
        );
        assert!(!Error::AuthDenied.is_dial_error());
    }
}
