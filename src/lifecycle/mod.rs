//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Flush logs → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Reload configuration into the security context
//! ```
//!
//! # Design Decisions
//! - Fail fast: invalid configuration at startup is fatal
//! - Invalid configuration on reload is logged and ignored

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{reload_on_hangup, shutdown_signal, ConfigSource};
