mod common;

use reqwest::StatusCode;
use serde_json::Value;

use storefront_gate::observability::AuditEntry;
use storefront_gate::security::{IdentityClaims, TokenAuthenticator};

use common::{client, start_gate, JWT_SECRET};

#[tokio::test]
async fn test_missing_token_rejected() {
    let gate = start_gate(|_| {}).await;

    let res = client().get(gate.url("/api/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "No auth token provided");

    let res = client()
        .get(gate.url("/api/me"))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "No auth token provided");
}

#[tokio::test]
async fn test_valid_token_exposes_claims() {
    let gate = start_gate(|_| {}).await;
    let tokens = TokenAuthenticator::new(JWT_SECRET.as_bytes(), 3600, 0);
    let token = tokens.issue("user-42", "jane@example.com", "admin").unwrap();

    let res = client()
        .get(gate.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let claims: IdentityClaims = res.json().await.unwrap();
    assert_eq!(claims.sub, "user-42");
    assert_eq!(claims.email, "jane@example.com");
    assert_eq!(claims.role, "admin");
}

#[tokio::test]
async fn test_foreign_token_rejected_and_audited() {
    let gate = start_gate(|_| {}).await;
    let foreign = TokenAuthenticator::new(b"some-other-secret-0123456789abcdef", 3600, 0);
    let token = foreign.issue("user-42", "jane@example.com", "admin").unwrap();

    let res = client()
        .get(gate.url("/api/me"))
        .bearer_auth(&token)
        .header("User-Agent", "integration-test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Auth failed");

    let log = gate.read_audit_log().await;
    let entry: AuditEntry = serde_json::from_str(log.lines().last().unwrap()).unwrap();
    assert_eq!(entry.event_type.as_str(), "AUTH_FAILURE");
    assert_eq!(entry.ip, "127.0.0.1");
    assert_eq!(entry.user_agent, "integration-test");
    assert!(!log.contains(&token));
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let gate = start_gate(|_| {}).await;
    let tokens = TokenAuthenticator::new(JWT_SECRET.as_bytes(), 3600, 0);
    let now = chrono::Utc::now().timestamp();
    let token = tokens
        .issue_claims(&IdentityClaims {
            sub: "user-42".into(),
            email: "jane@example.com".into(),
            role: "customer".into(),
            iat: now - 7200,
            exp: now - 3600,
        })
        .unwrap();

    let res = client()
        .get(gate.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Auth failed");
}

#[tokio::test]
async fn test_health_needs_no_credentials() {
    let gate = start_gate(|_| {}).await;
    let res = client().get(gate.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
}
