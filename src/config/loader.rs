//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{Environment, GateConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::security::allowlist::Allowlist;

/// Deployment environment; `production` enables the strict policies.
pub const ENV_NODE_ENV: &str = "NODE_ENV";
/// Alias for [`ENV_NODE_ENV`], consulted only when it is unset or blank.
pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_TRUST_PROXY: &str = "TRUST_PROXY";
pub const ENV_WEBHOOK_ALLOWED_IPS: &str = "WEBHOOK_ALLOWED_IPS";
pub const ENV_WEBHOOK_SECRET: &str = "WEBHOOK_SECRET";
/// Provider-named alias for [`ENV_WEBHOOK_SECRET`].
pub const ENV_STRIPE_WEBHOOK_SECRET: &str = "STRIPE_WEBHOOK_SECRET";
pub const ENV_JWT_KEY: &str = "JWT_KEY";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_AUDIT_LOG_DIR: &str = "AUDIT_LOG_DIR";
pub const ENV_ERROR_LOG_DIR: &str = "ERROR_LOG_DIR";
pub const ENV_APP_ROOT: &str = "APP_ROOT";
pub const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";
/// Listen port on all interfaces; ignored when `BIND_ADDRESS` is set.
pub const ENV_PORT: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GateConfig = toml::from_str(&content)?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus the process environment.
pub fn load_from_env() -> Result<GateConfig, ConfigError> {
    let config = apply_env_overrides(GateConfig::default(), |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment-style keys on top of `config`.
///
/// `lookup` is injected so tests can supply their own environment.
pub fn apply_env_overrides<F>(mut config: GateConfig, lookup: F) -> GateConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env) = first_set(&lookup, &[ENV_NODE_ENV, ENV_APP_ENV]) {
        config.environment = Environment::parse(&env);
    }
    if let Some(flag) = lookup(ENV_TRUST_PROXY) {
        config.trust_proxy = parse_bool(&flag);
    }
    if let Some(ips) = lookup(ENV_WEBHOOK_ALLOWED_IPS) {
        config.webhook.allowed_ips = Allowlist::parse(&ips);
    }
    if let Some(secret) = first_set(&lookup, &[ENV_WEBHOOK_SECRET, ENV_STRIPE_WEBHOOK_SECRET]) {
        config.webhook.secret = secret;
    }
    if let Some(secret) = lookup(ENV_JWT_KEY) {
        config.auth.jwt_secret = secret;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = Some(level);
    }
    if let Some(dir) = lookup(ENV_AUDIT_LOG_DIR) {
        config.logging.audit_log_dir = Some(dir);
    }
    if let Some(dir) = lookup(ENV_ERROR_LOG_DIR) {
        config.logging.error_log_dir = Some(dir);
    }
    if let Some(root) = lookup(ENV_APP_ROOT) {
        config.logging.app_root = PathBuf::from(root);
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    } else if let Some(port) = lookup(ENV_PORT) {
        config.listener.bind_address = format!("0.0.0.0:{}", port.trim());
    }
    config
}

/// Value of the first key that is set and non-blank.
fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
}

/// Boolean-like strings: `1`, `true`, `yes`, `on` (any case) are true.
pub fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
