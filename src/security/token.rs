//! Bearer token authentication.
//!
//! Tokens are HS256 JWTs signed with the server-held secret. Every
//! verification failure maps to the same public 401; the specific cause is
//! only logged and audited.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::schema::AuthConfig;
use crate::error::GateError;
use crate::http::server::GateState;
use crate::observability::audit::{AuditDetails, AuditEventType, AuditOutcome};
use crate::observability::metrics;
use crate::security::client_ip::client_address;

/// Verified identity attached to authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user id).
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Token verification and issuance errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token signature invalid")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Expired => "expired",
            TokenError::InvalidSignature => "signature",
            TokenError::Malformed(_) => "malformed",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Signs and verifies bearer tokens with one symmetric secret.
#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenAuthenticator {
    pub fn new(secret: &[u8], ttl_secs: u64, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.token_ttl_secs,
            config.leeway_secs,
        )
    }

    /// Issue a token for a user, valid for the configured lifetime.
    pub fn issue(&self, subject: &str, email: &str, role: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = IdentityClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        self.issue_claims(&claims)
    }

    /// Sign explicit claims.
    pub fn issue_claims(&self, claims: &IdentityClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        let data = decode::<IdentityClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// A missing header, another scheme, or an empty token all count as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware guarding protected API routes.
pub async fn require_auth(
    State(state): State<GateState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let ctx = state.security();

    let verified = match bearer_token(req.headers()) {
        None => Err(GateError::MissingToken),
        Some(token) => ctx.tokens.verify(token).map_err(GateError::from),
    };

    match verified {
        Ok(claims) => {
            tracing::debug!(user_id = %claims.sub, role = %claims.role, "Request authenticated");
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(GateError::MissingToken) => {
            tracing::debug!(path = %req.uri().path(), "No bearer token on protected route");
            metrics::record_auth_failure("missing");
            GateError::MissingToken.into_response()
        }
        Err(err) => {
            let client = client_address(&req, ctx.config.trust_proxy);
            let reason = match &err {
                GateError::InvalidToken(token_err) => {
                    metrics::record_auth_failure(token_err.kind());
                    token_err.to_string()
                }
                other => other.to_string(),
            };
            tracing::warn!(client = %client.address, reason = %reason, "Bearer token rejected");
            state.audit.record(
                AuditEventType::AuthFailure,
                AuditDetails::from_request(&req, &client)
                    .outcome(AuditOutcome::Failure)
                    .reason(reason),
            );
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new(SECRET, 3600, 0)
    }

    #[test]
    fn test_issue_then_verify() {
        let auth = authenticator();
        let token = auth.issue("user-42", "jane@example.com", "customer").unwrap();
        let claims = auth.verify(&token).unwrap();

        assert_eq!(claims.sub, "user-42");
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.role, "customer");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = authenticator();
        let now = Utc::now().timestamp();
        let token = auth
            .issue_claims(&IdentityClaims {
                sub: "user-1".into(),
                email: "a@b.c".into(),
                role: "admin".into(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert_eq!(auth.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = TokenAuthenticator::new(b"another-secret-another-secret-xx", 3600, 0);
        let token = other.issue("user-1", "a@b.c", "admin").unwrap();
        assert_eq!(authenticator().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_rejected() {
        let auth = authenticator();
        assert!(matches!(auth.verify("garbage"), Err(TokenError::Malformed(_))));
        assert!(matches!(auth.verify(""), Err(TokenError::Malformed(_))));
        assert!(auth.verify("a.b.c").is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let auth = authenticator();
        let token = auth.issue("user-1", "a@b.c", "customer").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &IdentityClaims {
                sub: "user-1".into(),
                email: "a@b.c".into(),
                role: "admin".into(),
                iat: 0,
                exp: i64::MAX / 2,
            },
            &EncodingKey::from_secret(b"attacker"),
        )
        .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(auth.verify(&spliced), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert_eq!(bearer_token(&headers), None);
    }
}
