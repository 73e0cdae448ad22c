//! Webhook signature validation.
//!
//! The expected signature is HMAC-SHA-256 over the exact bytes received,
//! keyed by the shared secret. Verification runs on the raw bytes before the
//! body is parsed.
//!
//! # Failure handling
//! - No signature header: 401, a client integration problem.
//! - Malformed hex, wrong length, or wrong value: 403, indistinguishable to
//!   the caller.
//! - A declared signature whose decoded length differs from the digest is
//!   rejected before any byte comparison runs. Length is public; content is
//!   compared in constant time.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{digest::Key, Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::error::GateError;
use crate::http::server::GateState;
use crate::observability::audit::{AuditDetails, AuditEventType, AuditOutcome};
use crate::observability::metrics;
use crate::security::client_ip::client_address;

type HmacSha256 = Hmac<Sha256>;

/// Primary signature header.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Alias accepted for providers that cannot rename their header.
pub const SIGNATURE_HEADER_ALIAS: &str = "x-signature";

/// Optional scheme prefix on the declared signature.
const SHA256_PREFIX: &[u8] = b"sha256=";

/// Why a declared signature was rejected. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureFailure {
    #[error("signature is not valid hex")]
    MalformedEncoding,

    #[error("signature has the wrong length")]
    LengthMismatch,

    #[error("signature does not match")]
    Mismatch,
}

impl SignatureFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            SignatureFailure::MalformedEncoding => "malformed",
            SignatureFailure::LengthMismatch => "length",
            SignatureFailure::Mismatch => "mismatch",
        }
    }
}

/// The verified request body, exactly as received.
#[derive(Debug, Clone)]
pub struct RawBody(pub Bytes);

/// HMAC verifier keyed once at startup and cloned per request.
#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha256,
}

impl WebhookVerifier {
    /// Key the verifier. Any secret length is accepted: secrets longer than
    /// the SHA-256 block are hashed first, shorter ones are zero-padded.
    pub fn new(secret: &[u8]) -> Self {
        let mut key = Key::<HmacSha256>::default();
        if secret.len() > key.len() {
            let hashed = <Sha256 as sha2::Digest>::digest(secret);
            key[..hashed.len()].copy_from_slice(&hashed);
        } else {
            key[..secret.len()].copy_from_slice(secret);
        }
        Self {
            mac: HmacSha256::new(&key),
        }
    }

    /// Raw HMAC-SHA-256 digest of `body`.
    pub fn digest(&self, body: &[u8]) -> Vec<u8> {
        self.mac.clone().chain_update(body).finalize().into_bytes().to_vec()
    }

    /// Hex-encoded signature of `body`, as a sender would attach it.
    pub fn sign_hex(&self, body: &[u8]) -> String {
        hex::encode(self.digest(body))
    }

    /// Verify `declared` against the body using a constant-time comparison.
    pub fn verify(&self, body: &[u8], declared: &[u8]) -> Result<(), SignatureFailure> {
        self.verify_with(body, declared, constant_time_eq)
    }

    /// Verify with an explicit comparator.
    ///
    /// `compare` is only invoked when both buffers have the same length.
    pub fn verify_with<F>(&self, body: &[u8], declared: &[u8], compare: F) -> Result<(), SignatureFailure>
    where
        F: FnOnce(&[u8], &[u8]) -> bool,
    {
        let declared = declared.strip_prefix(SHA256_PREFIX).unwrap_or(declared);
        let declared = hex::decode(declared).map_err(|_| SignatureFailure::MalformedEncoding)?;
        let expected = self.digest(body);

        if declared.len() != expected.len() {
            return Err(SignatureFailure::LengthMismatch);
        }

        if compare(&expected, &declared) {
            Ok(())
        } else {
            Err(SignatureFailure::Mismatch)
        }
    }
}

/// Byte comparison whose running time does not depend on where inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// The declared signature, primary header first.
pub fn declared_signature(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(SIGNATURE_HEADER_ALIAS))
}

/// Middleware verifying webhook bodies against the shared secret.
///
/// On success the buffered bytes become the body again and are also attached
/// as [`RawBody`].
pub async fn webhook_signature_middleware(
    State(state): State<GateState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ctx = state.security();
    let client = client_address(&req, ctx.config.trust_proxy);

    let Some(declared) = declared_signature(req.headers()).cloned() else {
        tracing::warn!(client = %client.address, path = %req.uri().path(), "Webhook signature missing");
        metrics::record_webhook_rejection("missing");
        return GateError::SignatureMissing.into_response();
    };

    let audit_details = AuditDetails::from_request(&req, &client);
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, ctx.config.webhook.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(client = %client.address, error = %e, "Webhook body rejected");
            metrics::record_webhook_rejection("body");
            return GateError::BodyRejected.into_response();
        }
    };

    match ctx.webhook.verify(&bytes, declared.as_bytes()) {
        Ok(()) => {
            tracing::debug!(client = %client.address, bytes = bytes.len(), "Webhook signature verified");
            let mut req = Request::from_parts(parts, Body::from(bytes.clone()));
            req.extensions_mut().insert(RawBody(bytes));
            next.run(req).await
        }
        Err(failure) => {
            tracing::warn!(
                client = %client.address,
                reason = %failure,
                path = %parts.uri.path(),
                "Webhook signature rejected"
            );
            metrics::record_webhook_rejection(failure.kind());
            state.audit.record(
                AuditEventType::WebhookRejected,
                audit_details
                    .outcome(AuditOutcome::Failure)
                    .reason(failure.to_string()),
            );
            GateError::from(failure).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const SECRET: &[u8] = b"whsec_test_secret";

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET)
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let v = WebhookVerifier::new(b"Jefe");
        assert_eq!(
            v.sign_hex(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_any_secret_length_matches_hmac_keying() {
        for len in [0usize, 1, 20, 63, 64, 65, 131] {
            let secret = vec![0xaa_u8; len];
            let reference = HmacSha256::new_from_slice(&secret)
                .unwrap()
                .chain_update(b"payload")
                .finalize()
                .into_bytes()
                .to_vec();
            assert_eq!(WebhookVerifier::new(&secret).digest(b"payload"), reference, "len {len}");
        }
    }

    #[test]
    fn test_long_key_vector() {
        // RFC 4231 test case 6
        let v = WebhookVerifier::new(&[0xaa; 131]);
        assert_eq!(
            v.sign_hex(b"Test Using Larger Than Block-Size Key - Hash Key First"),
            "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54"
        );
    }

    #[test]
    fn test_valid_signature_accepted() {
        let v = verifier();
        let body = br#"{"Body":{"stkCallback":{"ResultCode":0}}}"#;
        let sig = v.sign_hex(body);
        assert_eq!(v.verify(body, sig.as_bytes()), Ok(()));
        assert_eq!(v.verify(body, sig.to_uppercase().as_bytes()), Ok(()));
        assert_eq!(v.verify(body, format!("sha256={sig}").as_bytes()), Ok(()));
    }

    #[test]
    fn test_single_char_change_rejected() {
        let v = verifier();
        let body = b"amount=100";
        let sig = v.sign_hex(body);

        for i in 0..sig.len() {
            let mut altered: Vec<u8> = sig.clone().into_bytes();
            altered[i] = if altered[i] == b'0' { b'1' } else { b'0' };
            assert_eq!(
                v.verify(body, &altered),
                Err(SignatureFailure::Mismatch),
                "position {i}"
            );
        }
    }

    #[test]
    fn test_body_change_rejected() {
        let v = verifier();
        let sig = v.sign_hex(b"amount=100");
        assert_eq!(v.verify(b"amount=1000", sig.as_bytes()), Err(SignatureFailure::Mismatch));
        assert_eq!(v.verify(b"amount=100 ", sig.as_bytes()), Err(SignatureFailure::Mismatch));
    }

    #[test]
    fn test_length_mismatch_skips_comparator() {
        let v = verifier();
        let body = b"payload";
        let calls = Cell::new(0);
        let counting = |a: &[u8], b: &[u8]| {
            calls.set(calls.get() + 1);
            constant_time_eq(a, b)
        };

        let short = &v.sign_hex(body)[..62];
        assert_eq!(
            v.verify_with(body, short.as_bytes(), counting),
            Err(SignatureFailure::LengthMismatch)
        );
        assert_eq!(calls.get(), 0);

        let long = format!("{}00", v.sign_hex(body));
        assert_eq!(
            v.verify_with(body, long.as_bytes(), counting),
            Err(SignatureFailure::LengthMismatch)
        );
        assert_eq!(v.verify_with(body, b"", counting), Err(SignatureFailure::LengthMismatch));
        assert_eq!(calls.get(), 0);

        let sig = v.sign_hex(body);
        assert_eq!(v.verify_with(body, sig.as_bytes(), counting), Ok(()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_malformed_encoding_rejected() {
        let v = verifier();
        let body = b"payload";
        let mut sig = v.sign_hex(body);
        sig.replace_range(0..1, "z");
        assert_eq!(v.verify(body, sig.as_bytes()), Err(SignatureFailure::MalformedEncoding));
        assert_eq!(v.verify(body, b"abc"), Err(SignatureFailure::MalformedEncoding));
        assert_eq!(v.verify(body, "ünïcode".as_bytes()), Err(SignatureFailure::MalformedEncoding));
    }

    #[test]
    fn test_different_secret_rejected() {
        let body = b"payload";
        let other = WebhookVerifier::new(b"another-secret").sign_hex(body);
        assert_eq!(verifier().verify(body, other.as_bytes()), Err(SignatureFailure::Mismatch));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn test_declared_signature_header_precedence() {
        let mut headers = HeaderMap::new();
        assert!(declared_signature(&headers).is_none());

        headers.insert(SIGNATURE_HEADER_ALIAS, HeaderValue::from_static("alias"));
        assert_eq!(declared_signature(&headers).unwrap(), "alias");

        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("primary"));
        assert_eq!(declared_signature(&headers).unwrap(), "primary");
    }
}
