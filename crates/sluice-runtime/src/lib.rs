//! # Sluice Runtime
//!
//! Process runtime around the proxy engine:
//! - Dialer bring-up from configuration (overlay gateway probe)
//! - Server lifecycle (startup, running, shutdown)
//! - Graceful shutdown with signal handling

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod bootstrap;
pub mod server;
pub mod shutdown;

pub use bootstrap::build_dialer;
pub use server::{Server, ServerBuilder};
pub use shutdown::{ShutdownSignal, SignalHandler};

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Server is initializing
    Initializing,
    /// Server is accepting connections
    Running,
    /// Server stopped accepting and is draining connections
    ShuttingDown,
    /// Server is stopped
    Stopped,
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bootstrap::build_dialer;
    pub use crate::server::{Server, ServerBuilder};
    pub use crate::shutdown::{ShutdownSignal, SignalHandler};
    pub use crate::RuntimeState;
}
