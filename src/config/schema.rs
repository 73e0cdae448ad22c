//! Configuration schema definitions.
//!
//! This module defines the complete, closed configuration structure for the
//! gate. All types derive Serde traits for deserialization from config files;
//! environment overrides are applied on top by the loader.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::security::allowlist::Allowlist;

/// Minimum accepted length of the token-signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Deployment environment. Production tightens several defaults.
    pub environment: Environment,

    /// Believe `X-Forwarded-For` / `X-Real-IP` as the client origin.
    pub trust_proxy: bool,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Bearer token settings.
    pub auth: AuthConfig,

    /// Webhook signature and origin settings.
    pub webhook: WebhookConfig,

    /// Secure logging and audit settings.
    pub logging: LoggingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GateConfig {
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Anything that is not `production` or `test` is treated as development.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Bearer token configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric HS256 signing secret.
    pub jwt_secret: String,

    /// Lifetime of issued tokens in seconds.
    pub token_ttl_secs: u64,

    /// Clock skew tolerance for `exp` in seconds.
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 86_400,
            leeway_secs: 0,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &mask(&self.jwt_secret))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Webhook configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared HMAC-SHA-256 secret.
    pub secret: String,

    /// Permitted client addresses (comma-separated in config files).
    pub allowed_ips: Allowlist,

    /// Largest webhook body buffered for verification.
    pub max_body_bytes: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            allowed_ips: Allowlist::default(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &mask(&self.secret))
            .field("allowed_ips", &self.allowed_ips)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level override (error, warn, info, debug). Unrecognized values are ignored.
    pub level: Option<String>,

    /// Application root; log directories must resolve inside it.
    pub app_root: PathBuf,

    /// Error log directory, relative to `app_root` unless absolute.
    pub error_log_dir: Option<String>,

    /// Audit log directory, relative to `app_root` unless absolute.
    pub audit_log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            app_root: PathBuf::from("."),
            error_log_dir: None,
            audit_log_dir: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PRODUCTION "), Environment::Production);
        assert_eq!(Environment::parse("test"), Environment::Test);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert_eq!(Environment::parse(""), Environment::Development);
    }

    #[test]
    fn test_debug_masks_secrets() {
        let mut config = GateConfig::default();
        config.auth.jwt_secret = "super-secret-signing-key-material!".into();
        config.webhook.secret = "whsec_abc".into();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("whsec_abc"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_toml_sections() {
        let raw = r#"
            environment = "production"
            trust_proxy = true

            [webhook]
            secret = "whsec"
            allowed_ips = "196.201.214.200, 196.201.214.206"

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
        "#;
        let config: GateConfig = toml::from_str(raw).unwrap();
        assert!(config.is_production());
        assert!(config.trust_proxy);
        assert_eq!(config.webhook.allowed_ips.len(), 2);
        assert!(config.webhook.allowed_ips.contains("196.201.214.206"));
        assert_eq!(config.auth.token_ttl_secs, 86_400);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3001");
    }
}
