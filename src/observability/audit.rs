//! Append-only audit trail of security-relevant events.
//!
//! Entries have a fixed shape: optional fields are written as `null` or
//! `"unknown"` rather than omitted so downstream consumers see a stable
//! schema. Recording never fails the caller.

use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::http::{header::USER_AGENT, Request};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::observability::files::{AppendWriter, FailureHook};
use crate::observability::logging::SecureLogger;
use crate::observability::metrics;
use crate::observability::redaction::redact;
use crate::security::client_ip::ResolvedClientAddress;

/// File name of the audit log inside its directory.
pub const AUDIT_LOG_FILE: &str = "audit.log";

/// Sentinel for unknown address / user agent.
pub const UNKNOWN: &str = "unknown";

/// Tracing target of the console mirror. Lives under the crate prefix so the
/// default filter lets it through.
pub const AUDIT_TARGET: &str = "storefront_gate::audit";

/// Closed set of audited events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    UserSignup,
    UserLogin,
    LoginFailed,
    Logout,
    AuthFailure,
    TokenIssued,
    PasswordChanged,
    RoleChanged,
    UserDeleted,
    WebhookRejected,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::UserSignup => "USER_SIGNUP",
            AuditEventType::UserLogin => "USER_LOGIN",
            AuditEventType::LoginFailed => "LOGIN_FAILED",
            AuditEventType::Logout => "LOGOUT",
            AuditEventType::AuthFailure => "AUTH_FAILURE",
            AuditEventType::TokenIssued => "TOKEN_ISSUED",
            AuditEventType::PasswordChanged => "PASSWORD_CHANGED",
            AuditEventType::RoleChanged => "ROLE_CHANGED",
            AuditEventType::UserDeleted => "USER_DELETED",
            AuditEventType::WebhookRejected => "WEBHOOK_REJECTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    #[default]
    Success,
    Failure,
}

/// Caller-supplied details; anything left unset gets a sentinel.
#[derive(Debug, Clone, Default)]
pub struct AuditDetails {
    user_id: Option<String>,
    email: Option<String>,
    ip: Option<String>,
    user_agent: Option<String>,
    outcome: AuditOutcome,
    reason: Option<String>,
    metadata: Option<Value>,
}

impl AuditDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source address and user agent taken from a request.
    pub fn from_request<B>(req: &Request<B>, client: &ResolvedClientAddress) -> Self {
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            ip: Some(client.address.clone()),
            user_agent,
            ..Self::default()
        }
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One audit record. Every key is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub ip: String,
    pub user_agent: String,
    pub outcome: AuditOutcome,
    pub reason: Option<String>,
    pub metadata: Option<Value>,
}

impl AuditEntry {
    pub fn build(event_type: AuditEventType, details: AuditDetails) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            user_id: details.user_id,
            email: details.email,
            ip: details.ip.unwrap_or_else(|| UNKNOWN.to_string()),
            user_agent: details.user_agent.unwrap_or_else(|| UNKNOWN.to_string()),
            outcome: details.outcome,
            reason: details.reason,
            metadata: details.metadata.as_ref().map(redact),
        }
    }
}

/// Records audit entries to the console and an owner-only file.
#[derive(Clone)]
pub struct AuditLogger {
    file: Option<AppendWriter>,
    logger: SecureLogger,
}

impl AuditLogger {
    /// Audit logger writing under `dir`. Falls back to console-only, reporting
    /// the problem through `logger`.
    pub fn init(dir: &Path, logger: SecureLogger) -> Self {
        let hook_logger = logger.clone();
        let hook: FailureHook = Arc::new(move |path: &Path, err: &io::Error| {
            hook_logger.error(
                "Failed to write audit log",
                Some(&json!({ "path": path.display().to_string(), "error": err.to_string() })),
            );
        });

        let file = match AppendWriter::open(dir, AUDIT_LOG_FILE, Some(hook)) {
            Ok(writer) => Some(writer),
            Err(e) => {
                logger.error_with(
                    "Audit log file unavailable, auditing to console only",
                    &e,
                    Some(&json!({ "dir": dir.display().to_string() })),
                );
                None
            }
        };

        Self { file, logger }
    }

    pub fn console_only(logger: SecureLogger) -> Self {
        Self { file: None, logger }
    }

    pub fn audit_log_path(&self) -> Option<&Path> {
        self.file.as_ref().map(AppendWriter::path)
    }

    /// Record an event. Returns the entry as written.
    pub fn record(&self, event_type: AuditEventType, details: AuditDetails) -> AuditEntry {
        let entry = AuditEntry::build(event_type, details);
        metrics::record_audit_event(event_type.as_str());

        match serde_json::to_string(&entry) {
            Ok(line) => {
                tracing::info!(target: AUDIT_TARGET, event = event_type.as_str(), entry = %line, "Audit event");
                if let Some(file) = &self.file {
                    file.append(line);
                }
            }
            Err(e) => {
                self.logger.error(
                    "Failed to serialize audit entry",
                    Some(&json!({ "event": event_type.as_str(), "error": e.to_string() })),
                );
            }
        }

        entry
    }

    /// Wait for queued audit writes.
    pub async fn flush(&self) {
        if let Some(file) = &self.file {
            file.flush().await;
        }
    }
}
