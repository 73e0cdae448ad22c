//! Storefront request-authentication gate.
//!
//! Client address resolution, webhook origin allow-listing, webhook
//! signature verification, bearer-token authentication, redacting logs
//! and an append-only audit trail, wired into an Axum server.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GateConfig;
pub use error::GateError;
pub use http::{GateState, HttpServer};
pub use lifecycle::Shutdown;
