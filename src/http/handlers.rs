//! Route handlers. Everything here runs after the security stages have
//! admitted the request.

use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::error::GateError;
use crate::http::server::GateState;
use crate::security::{IdentityClaims, RawBody};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Echo the claims attached by token authentication.
pub async fn whoami(Extension(claims): Extension<IdentityClaims>) -> Json<IdentityClaims> {
    Json(claims)
}

/// Acknowledge a verified payment callback.
///
/// The body has already passed signature verification; it is logged
/// with sensitive fields redacted.
pub async fn payment_webhook(
    State(state): State<GateState>,
    Extension(RawBody(body)): Extension<RawBody>,
) -> Result<Json<Value>, GateError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, bytes = body.len(), "Webhook body is not JSON");
        GateError::InvalidPayload
    })?;

    state.logger.info("Payment webhook received", Some(&payload));
    Ok(Json(json!({ "message": "Webhook received" })))
}
