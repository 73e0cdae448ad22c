//! Structured, redacting logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Gate application log calls by a configured level
//! - Redact sensitive payload fields before any output
//! - Persist error entries to an owner-only file
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment
//! - File writes are fire-and-forget; logging never fails a request

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::GateConfig;
use crate::observability::files::AppendWriter;
use crate::observability::redaction::redact;

/// File name of the error log inside its directory.
pub const ERROR_LOG_FILE: &str = "error.log";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "storefront_gate=debug,tower_http=info";

/// Install the global tracing subscriber.
pub fn init_tracing(config: &GateConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Application log levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// `info` in production, `debug` elsewhere, unless a recognized override is set.
    pub fn effective(is_production: bool, override_level: Option<&str>) -> Self {
        override_level
            .and_then(LogLevel::parse)
            .unwrap_or(if is_production { LogLevel::Info } else { LogLevel::Debug })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted log record. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

struct LoggerSettings {
    is_production: bool,
    level_override: Option<String>,
}

/// Level-filtered logger that redacts payloads and persists errors.
#[derive(Clone)]
pub struct SecureLogger {
    settings: Arc<LoggerSettings>,
    error_file: Option<AppendWriter>,
}

impl SecureLogger {
    /// Logger writing errors under `error_dir`.
    ///
    /// Falls back to console-only when the file cannot be prepared.
    pub fn init(config: &GateConfig, error_dir: &Path) -> Self {
        let mut logger = Self::console_only(config);
        match AppendWriter::open(error_dir, ERROR_LOG_FILE, None) {
            Ok(writer) => logger.error_file = Some(writer),
            Err(e) => {
                tracing::error!(
                    dir = %error_dir.display(),
                    error = %e,
                    "Error log file unavailable, logging to console only"
                );
            }
        }
        logger
    }

    pub fn console_only(config: &GateConfig) -> Self {
        Self {
            settings: Arc::new(LoggerSettings {
                is_production: config.is_production(),
                level_override: config.logging.level.clone(),
            }),
            error_file: None,
        }
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::effective(self.settings.is_production, self.settings.level_override.as_deref())
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level()
    }

    pub fn error_log_path(&self) -> Option<&Path> {
        self.error_file.as_ref().map(AppendWriter::path)
    }

    pub fn debug(&self, message: &str, data: Option<&Value>) {
        self.log(LogLevel::Debug, message, data);
    }

    pub fn info(&self, message: &str, data: Option<&Value>) {
        self.log(LogLevel::Info, message, data);
    }

    pub fn warn(&self, message: &str, data: Option<&Value>) {
        self.log(LogLevel::Warn, message, data);
    }

    pub fn error(&self, message: &str, data: Option<&Value>) {
        let entry = self.entry(LogLevel::Error, message, data);
        self.emit(&entry);
        self.persist(&entry);
    }

    /// Error entry carrying an error's source chain. A backtrace is attached
    /// outside production only.
    pub fn error_with(&self, message: &str, err: &(dyn StdError + 'static), data: Option<&Value>) {
        let mut entry = self.entry(LogLevel::Error, message, data);
        entry.error = Some(error_chain(err));
        if !self.settings.is_production {
            entry.stack = Some(Backtrace::force_capture().to_string());
        }
        self.emit(&entry);
        self.persist(&entry);
    }

    /// Wait for queued error-file writes.
    pub async fn flush(&self) {
        if let Some(writer) = &self.error_file {
            writer.flush().await;
        }
    }

    fn log(&self, level: LogLevel, message: &str, data: Option<&Value>) {
        if !self.enabled(level) {
            return;
        }
        let entry = self.entry(level, message, data);
        self.emit(&entry);
    }

    fn entry(&self, level: LogLevel, message: &str, data: Option<&Value>) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            data: data.map(redact),
            error: None,
            stack: None,
        }
    }

    fn emit(&self, entry: &LogEntry) {
        let data = entry.data.as_ref().map(Value::to_string).unwrap_or_default();
        let error = entry.error.as_deref().unwrap_or_default();
        match entry.level {
            LogLevel::Error => tracing::error!(data = %data, error = %error, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(data = %data, "{}", entry.message),
            LogLevel::Info => tracing::info!(data = %data, "{}", entry.message),
            LogLevel::Debug => tracing::debug!(data = %data, "{}", entry.message),
        }
    }

    fn persist(&self, entry: &LogEntry) {
        let Some(writer) = &self.error_file else {
            return;
        };
        match serde_json::to_string(entry) {
            Ok(line) => writer.append(line),
            Err(e) => tracing::error!(error = %e, "Failed to serialize log entry"),
        }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
