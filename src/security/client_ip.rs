//! Client address resolution.
//!
//! With proxy trust disabled the socket peer is the only source of truth;
//! forwarded headers are ignored even when present. With trust enabled the
//! leftmost `X-Forwarded-For` entry wins, then `X-Real-IP`, then the socket
//! peer.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::http::server::GateState;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Placeholder address when neither socket nor headers identify the client.
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Where a resolved address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustBasis {
    DirectSocket,
    ForwardedHeader,
}

/// The request's origin address as far as this process trusts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedClientAddress {
    pub address: String,
    pub basis: TrustBasis,
}

impl ResolvedClientAddress {
    fn direct(peer: Option<SocketAddr>) -> Self {
        Self {
            address: peer
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
            basis: TrustBasis::DirectSocket,
        }
    }

    fn forwarded(address: &str) -> Self {
        Self {
            address: address.to_string(),
            basis: TrustBasis::ForwardedHeader,
        }
    }
}

/// Resolve the client address from headers and the socket peer.
///
/// Header values are not checked for IP syntax; they pass through as opaque
/// strings and are compared exactly downstream.
pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> ResolvedClientAddress {
    if !trust_proxy {
        return ResolvedClientAddress::direct(peer);
    }

    let forwarded_for = header_str(headers, X_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());
    if let Some(first) = forwarded_for {
        return ResolvedClientAddress::forwarded(first);
    }

    if let Some(real_ip) = header_str(headers, X_REAL_IP).map(str::trim).filter(|v| !v.is_empty()) {
        return ResolvedClientAddress::forwarded(real_ip);
    }

    ResolvedClientAddress::direct(peer)
}

/// Resolve straight from a request, reading the socket peer from `ConnectInfo`.
pub fn resolve_request<B>(req: &Request<B>, trust_proxy: bool) -> ResolvedClientAddress {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    resolve(req.headers(), peer, trust_proxy)
}

/// The address stored by [`client_ip_middleware`], or a fresh resolution.
pub fn client_address<B>(req: &Request<B>, trust_proxy: bool) -> ResolvedClientAddress {
    req.extensions()
        .get::<ResolvedClientAddress>()
        .cloned()
        .unwrap_or_else(|| resolve_request(req, trust_proxy))
}

/// Resolves the client address once and stores it in request extensions.
pub async fn client_ip_middleware(
    State(state): State<GateState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trust_proxy = state.security().config.trust_proxy;
    let resolved = resolve_request(&req, trust_proxy);
    req.extensions_mut().insert(resolved);
    next.run(req).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
