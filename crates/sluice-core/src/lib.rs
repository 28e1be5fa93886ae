//! # Sluice Core
//!
//! Core types and error handling shared by the sluice forward proxy:
//! - Error taxonomy and its mapping to HTTP status codes
//! - Proxy credentials
//! - Dial mode reporting

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Credentials, DialMode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Credentials, DialMode};
}
