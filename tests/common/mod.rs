//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;

use storefront_gate::config::schema::Environment;
use storefront_gate::security::WebhookVerifier;
use storefront_gate::{GateConfig, GateState, HttpServer, Shutdown};

pub const JWT_SECRET: &str = "integration-jwt-secret-0123456789abcdef";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// A gate running on an ephemeral port. Dropping it stops the server.
pub struct TestGate {
    pub addr: SocketAddr,
    pub state: GateState,
    pub root: TempDir,
    shutdown: Shutdown,
}

impl TestGate {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn audit_log(&self) -> std::path::PathBuf {
        self.root.path().join("logs").join("audit.log")
    }

    /// Flush queued audit writes and read the file.
    pub async fn read_audit_log(&self) -> String {
        self.state.audit.flush().await;
        std::fs::read_to_string(self.audit_log()).unwrap_or_default()
    }
}

impl Drop for TestGate {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Baseline configuration; log files land in `root/logs`.
pub fn test_config(root: &std::path::Path) -> GateConfig {
    let mut config = GateConfig::default();
    config.environment = Environment::Test;
    config.auth.jwt_secret = JWT_SECRET.into();
    config.webhook.secret = WEBHOOK_SECRET.into();
    config.logging.app_root = root.to_path_buf();
    config
}

/// Start a gate with `customize` applied to the baseline configuration.
pub async fn start_gate<F>(customize: F) -> TestGate
where
    F: FnOnce(&mut GateConfig),
{
    let root = tempfile::tempdir().unwrap();
    let mut config = test_config(root.path());
    customize(&mut config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let state = server.state();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestGate { addr, state, root, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn sign(body: &[u8]) -> String {
    WebhookVerifier::new(WEBHOOK_SECRET.as_bytes()).sign_hex(body)
}
