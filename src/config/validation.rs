//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce secret presence and minimum length
//! - Validate value ranges (timeouts > 0, body limits > 0, bind address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, including on reload

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GateConfig, MIN_JWT_SECRET_LEN};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token signing secret is not set")]
    MissingJwtSecret,

    #[error("token signing secret is {len} bytes, at least {min} required")]
    JwtSecretTooShort { len: usize, min: usize },

    #[error("webhook signing secret is not set")]
    MissingWebhookSecret,

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("webhook body limit must be greater than zero")]
    ZeroBodyLimit,

    #[error("token lifetime must be greater than zero")]
    ZeroTokenTtl,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let secret_len = config.auth.jwt_secret.len();
    if secret_len == 0 {
        errors.push(ValidationError::MissingJwtSecret);
    } else if secret_len < MIN_JWT_SECRET_LEN {
        errors.push(ValidationError::JwtSecretTooShort {
            len: secret_len,
            min: MIN_JWT_SECRET_LEN,
        });
    }

    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }

    if config.webhook.secret.is_empty() {
        errors.push(ValidationError::MissingWebhookSecret);
    }

    if config.webhook.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
