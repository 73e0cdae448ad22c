//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, trace)
//!     → security::client_ip (resolve client address once)
//!     → per-route guards:
//!         /api/*        → security::token (bearer token)
//!         /webhooks/*   → security::allowlist → security::signature
//!     → handlers.rs
//!     → Send to client
//! ```

pub mod handlers;
pub mod server;

pub use server::{GateState, HttpServer, SecurityContext};
