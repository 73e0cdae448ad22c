//! Webhook origin allow-listing.
//!
//! Membership is an exact string match against the resolved client address.
//! Every denial produces the same public response.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GateError;
use crate::http::server::GateState;
use crate::observability::audit::{AuditDetails, AuditEventType, AuditOutcome};
use crate::observability::metrics;
use crate::security::client_ip::client_address;

/// Ordered set of permitted client addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct Allowlist {
    entries: Vec<String>,
}

impl Allowlist {
    /// Parse a comma-separated list. Entries are trimmed, empties dropped,
    /// duplicates kept once in first-seen order.
    pub fn parse(raw: &str) -> Self {
        let mut entries: Vec<String> = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            if !entries.iter().any(|existing| existing == entry) {
                entries.push(entry.to_string());
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.iter().any(|entry| entry == address)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl From<String> for Allowlist {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Allowlist> for String {
    fn from(list: Allowlist) -> Self {
        list.entries.join(",")
    }
}

/// Why an origin was refused. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OriginDenied {
    #[error("allow-list is empty in production")]
    EmptyInProduction,

    #[error("address is not on the allow-list")]
    NotListed,
}

impl OriginDenied {
    pub fn kind(&self) -> &'static str {
        match self {
            OriginDenied::EmptyInProduction => "empty_allowlist",
            OriginDenied::NotListed => "not_listed",
        }
    }
}

/// Decide whether `address` may reach webhook handlers.
///
/// An empty allow-list is permissive outside production and closed inside it.
pub fn check(address: &str, allowlist: &Allowlist, is_production: bool) -> Result<(), OriginDenied> {
    if allowlist.is_empty() {
        return if is_production {
            Err(OriginDenied::EmptyInProduction)
        } else {
            Ok(())
        };
    }

    if allowlist.contains(address) {
        Ok(())
    } else {
        Err(OriginDenied::NotListed)
    }
}

/// Middleware guarding webhook routes by client address.
pub async fn ip_allowlist_middleware(
    State(state): State<GateState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ctx = state.security();
    let client = client_address(&req, ctx.config.trust_proxy);

    match check(&client.address, &ctx.config.webhook.allowed_ips, ctx.config.is_production()) {
        Ok(()) => next.run(req).await,
        Err(denied) => {
            tracing::warn!(
                client = %client.address,
                basis = ?client.basis,
                reason = %denied,
                path = %req.uri().path(),
                "Webhook origin denied"
            );
            metrics::record_webhook_rejection(denied.kind());
            state.audit.record(
                AuditEventType::WebhookRejected,
                AuditDetails::from_request(&req, &client)
                    .outcome(AuditOutcome::Failure)
                    .reason(denied.to_string()),
            );
            GateError::from(denied).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_empties() {
        let list = Allowlist::parse(" 192.168.1.1 ,, 10.0.0.1 ,");
        assert_eq!(list.entries(), ["192.168.1.1", "10.0.0.1"]);
        assert_eq!(Allowlist::parse("").len(), 0);
        assert_eq!(Allowlist::parse(" , ,").len(), 0);
    }

    #[test]
    fn test_parse_deduplicates() {
        let list = Allowlist::parse("10.0.0.1,10.0.0.1, 10.0.0.2");
        assert_eq!(list.entries(), ["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_empty_list_policy() {
        let empty = Allowlist::default();
        assert_eq!(check("1.2.3.4", &empty, true), Err(OriginDenied::EmptyInProduction));
        assert_eq!(check("1.2.3.4", &empty, false), Ok(()));
    }

    #[test]
    fn test_whitespace_variants_match() {
        for raw in [
            "192.168.1.1,10.0.0.1",
            "192.168.1.1, 10.0.0.1",
            "192.168.1.1 ,10.0.0.1",
            "  192.168.1.1  ,  10.0.0.1  ",
        ] {
            let list = Allowlist::parse(raw);
            assert_eq!(check("10.0.0.1", &list, true), Ok(()), "raw = {raw:?}");
        }
    }

    #[test]
    fn test_exact_match_only() {
        let list = Allowlist::parse("10.0.0.1");
        assert_eq!(check("10.0.0.10", &list, false), Err(OriginDenied::NotListed));
        assert_eq!(check("10.0.0", &list, false), Err(OriginDenied::NotListed));
        assert_eq!(check(" 10.0.0.1", &list, false), Err(OriginDenied::NotListed));
    }

    #[test]
    fn test_serde_from_comma_string() {
        let list: Allowlist = serde_json::from_str("\"a, b,,c\"").unwrap();
        assert_eq!(list.entries(), ["a", "b", "c"]);
        assert_eq!(serde_json::to_string(&list).unwrap(), "\"a,b,c\"");
    }
}
