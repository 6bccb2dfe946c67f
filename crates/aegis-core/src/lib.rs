//! # Aegis Core
//!
//! The facade crate binding the prompt-injection defense pipeline together:
//! Input Scanner, Stream Monitor, Action Validator, Trajectory Analyzer, and
//! Audit log, plus the session lifecycle and policy configuration that sit
//! above all five.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          Aegis facade                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   guard_input ──▶ Input Scanner ──▶ Audit log ──▶ recovery mode │
//! │                                                                 │
//! │   guard_chain_step ──▶ Input Scanner ──▶ session risk/decay     │
//! │                                                                 │
//! │   create_stream_transform ──▶ Stream Monitor                    │
//! │                                                                 │
//! │   validate_action ──▶ per-session Action Validator               │
//! │                                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aegis_core::{Aegis, Policy, ScanStrategy};
//! use aegis_trajectory::{Message, Role};
//!
//! # async fn run() -> aegis_core::Result<()> {
//! let aegis = Aegis::new(Policy::balanced())?;
//! let messages = vec![Message { role: Role::User, content: "hello".to_string() }];
//! let passed = aegis.guard_input("session-1", &messages, ScanStrategy::LastUser).await?;
//! assert_eq!(passed, messages);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod session;

pub use config::{Policy, PolicyDocument};
pub use error::{AegisError, Result};
pub use facade::{
    Aegis, AutoRetryFuture, AutoRetryHandler, ChainStepOptions, ChainStepOutcome, RecoveryMode,
    ScanStrategy, SessionHandle,
};
pub use session::{SessionState, SessionStatus};

// Re-exported for callers who need a component's own types without adding
// the sub-crate as a direct dependency.
pub use aegis_audit::{AuditEntry, AuditLevel, AuditLog, Decision};
pub use aegis_scanner::{Detection, DetectionKind, InputScanner, ScanResult, Severity};
pub use aegis_stream::{StreamMonitor, StreamMonitorConfig, Violation};
pub use aegis_trajectory::{Message, Role, TrajectoryAnalyzer};
pub use aegis_validator::{ActionPolicy, ActionValidator};
