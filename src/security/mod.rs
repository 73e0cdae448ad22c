//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → client_ip.rs (resolve origin under the trust-proxy policy)
//!
//! Webhook routes:
//!     → allowlist.rs (origin must be on the allow-list)
//!     → signature.rs (HMAC-SHA-256 over the raw body)
//!     → webhook handler
//!
//! Protected API routes:
//!     → token.rs (bearer token, claims attached to the request)
//!     → business handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input: forwarded headers only count when configured
//! - Public failure messages are coarse; causes go to logs and the audit trail

pub mod allowlist;
pub mod client_ip;
pub mod signature;
pub mod token;

pub use allowlist::{check as check_origin, ip_allowlist_middleware, Allowlist, OriginDenied};
pub use client_ip::{client_ip_middleware, resolve as resolve_client_ip, ResolvedClientAddress, TrustBasis};
pub use signature::{webhook_signature_middleware, RawBody, SignatureFailure, WebhookVerifier};
pub use token::{require_auth, IdentityClaims, TokenAuthenticator, TokenError};
