//! Request-terminating errors and their HTTP mapping.
//!
//! Each failure category has its own variant and status, but the public body
//! is always `{"message": ...}` with a coarse message. Causes stay in logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::security::allowlist::OriginDenied;
use crate::security::signature::SignatureFailure;
use crate::security::token::TokenError;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("no auth token provided")]
    MissingToken,

    #[error("auth failed: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("webhook signature missing")]
    SignatureMissing,

    #[error("webhook signature rejected: {0}")]
    SignatureRejected(#[from] SignatureFailure),

    #[error("origin denied: {0}")]
    OriginDenied(#[from] OriginDenied),

    #[error("request body rejected")]
    BodyRejected,

    #[error("invalid webhook payload")]
    InvalidPayload,
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::MissingToken | GateError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            GateError::SignatureMissing => StatusCode::UNAUTHORIZED,
            GateError::SignatureRejected(_) | GateError::OriginDenied(_) => StatusCode::FORBIDDEN,
            GateError::BodyRejected => StatusCode::PAYLOAD_TOO_LARGE,
            GateError::InvalidPayload => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the caller. Never varies with the underlying cause.
    pub fn public_message(&self) -> &'static str {
        match self {
            GateError::MissingToken => "No auth token provided",
            GateError::InvalidToken(_) => "Auth failed",
            GateError::SignatureMissing => "Signature required",
            GateError::SignatureRejected(_) => "Invalid signature",
            GateError::OriginDenied(_) => "Access denied",
            GateError::BodyRejected => "Payload too large",
            GateError::InvalidPayload => "Invalid webhook payload",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.public_message() }))).into_response()
    }
}
