//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (SecureLogger: level gate, redaction, error file)
//!     → audit.rs (AuditLogger: security events, audit file)
//!     → metrics.rs (counters)
//!
//! Persistence:
//!     → files.rs (owner-only append writers, one task per file)
//!
//! Consumers:
//!     → Console (tracing subscriber, JSON in production)
//!     → error.log / audit.log (one JSON object per line)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Redaction happens before any output, console or file
//! - File writes never block or fail the request path

pub mod audit;
pub mod files;
pub mod logging;
pub mod metrics;
pub mod redaction;

pub use audit::{AuditDetails, AuditEntry, AuditEventType, AuditLogger, AuditOutcome};
pub use logging::{LogEntry, LogLevel, SecureLogger};
pub use redaction::{redact, REDACTED};
