//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (APP_ENV, JWT_KEY, WEBHOOK_SECRET, ...)
//!     → validation.rs (semantic checks, fail fast)
//!     → GateConfig (validated, immutable)
//!     → shared via Arc inside the SecurityContext
//!
//! On reload signal:
//!     loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the SecurityContext
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs, except secrets
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod paths;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AuthConfig, Environment, GateConfig, ListenerConfig, LoggingConfig, ObservabilityConfig,
    TimeoutConfig, WebhookConfig,
};
pub use validation::ValidationError;
