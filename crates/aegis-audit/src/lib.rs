//! # Audit Log and Alerting
//!
//! The sink for every scan and validation decision: a structured,
//! optionally-redacted, optionally-durable audit trail, plus rolling-window
//! alert rules over the same event stream.
//!
//! ## Flow
//!
//! ```text
//! AuditEntry ──▶ ambient tracing event (always)
//!            ──▶ level filter ──▶ redaction ──▶ ring buffer
//!                                            ├─▶ durable store (optional)
//!                                            └─▶ transports (console, json-file, otel, custom)
//! ```
//!
//! [`alerts::AlertManager`] runs independently: callers feed it the same
//! conditions the validator and scanner observe (a rate spike, a session
//! kill, a scan block), and it fires through whichever [`alerts::AlertTriggerKind`]
//! each rule is configured with, once its rolling-window threshold is
//! crossed and its cooldown has elapsed.
//!
//! ## Usage
//!
//! ```rust
//! use aegis_audit::{AuditEntry, AuditLevel, AuditLog, Decision};
//!
//! let log = AuditLog::new(AuditLevel::All).with_redaction(true);
//! log.log(AuditEntry::new("action_block", Decision::Blocked).with_reason("policy deny"));
//! assert_eq!(log.recent().len(), 1);
//! ```

pub mod alerts;
pub mod error;
pub mod log;
pub mod models;
pub mod storage;
pub mod transport;

pub use alerts::{Alert, AlertCondition, AlertManager, AlertRule, AlertTriggerKind};
pub use error::{AuditError, Result};
pub use log::AuditLog;
pub use models::{AuditEntry, AuditLevel, Decision};
pub use storage::AuditStore;
pub use transport::AuditTransport;
