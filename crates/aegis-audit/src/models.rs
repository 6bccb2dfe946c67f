//! # Audit Data Model
//!
//! An [`AuditEntry`] is the unit of record for every scan and decision
//! event flowing out of the validator and scanner: what happened, the
//! decision reached, and enough context to investigate it later.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The outcome an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Flagged,
    Blocked,
    Info,
}

/// One recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub session_id: Option<String>,
    pub event: String,
    pub decision: Decision,
    pub reason: Option<String>,
    pub context: HashMap<String, String>,
}

impl AuditEntry {
    pub fn new(event: impl Into<String>, decision: Decision) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            session_id: None,
            event: event.into(),
            decision,
            reason: None,
            context: HashMap::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with every context value replaced by `[REDACTED]`.
    /// `event` and `reason` are left intact - they identify the event, not
    /// the data involved in it.
    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        for value in redacted.context.values_mut() {
            *value = "[REDACTED]".to_string();
        }
        redacted
    }

    /// The `tracing` level the ambient log emits for this entry,
    /// independent of configured transports.
    pub fn tracing_level(&self) -> tracing::Level {
        match self.decision {
            Decision::Blocked => tracing::Level::WARN,
            Decision::Flagged => tracing::Level::INFO,
            Decision::Allowed | Decision::Info => tracing::Level::DEBUG,
        }
    }
}

/// Which entries a log accepts, by decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    /// Only `Decision::Blocked` entries.
    ViolationsOnly,
    /// `Blocked`, `Flagged`, and `Allowed` - every action taken, not just
    /// violations.
    Actions,
    /// Everything, including `Info`.
    All,
}

impl AuditLevel {
    pub fn accepts(&self, decision: Decision) -> bool {
        match self {
            AuditLevel::ViolationsOnly => decision == Decision::Blocked,
            AuditLevel::Actions => matches!(decision, Decision::Blocked | Decision::Flagged | Decision::Allowed),
            AuditLevel::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacted_clears_context_but_keeps_event_and_reason() {
        let entry = AuditEntry::new("action_block", Decision::Blocked)
            .with_reason("denied tool")
            .with_context("tool", "send_email")
            .with_context("params", "to=attacker@example.com");
        let redacted = entry.redacted();
        assert_eq!(redacted.event, "action_block");
        assert_eq!(redacted.reason.as_deref(), Some("denied tool"));
        assert!(redacted.context.values().all(|v| v == "[REDACTED]"));
    }

    #[test]
    fn violations_only_rejects_non_blocked() {
        assert!(AuditLevel::ViolationsOnly.accepts(Decision::Blocked));
        assert!(!AuditLevel::ViolationsOnly.accepts(Decision::Flagged));
        assert!(!AuditLevel::ViolationsOnly.accepts(Decision::Allowed));
    }

    #[test]
    fn actions_rejects_info_only() {
        assert!(AuditLevel::Actions.accepts(Decision::Allowed));
        assert!(!AuditLevel::Actions.accepts(Decision::Info));
    }

    #[test]
    fn all_accepts_everything() {
        for decision in [Decision::Allowed, Decision::Flagged, Decision::Blocked, Decision::Info] {
            assert!(AuditLevel::All.accepts(decision));
        }
    }

    #[test]
    fn tracing_level_matches_decision_severity() {
        assert_eq!(AuditEntry::new("e", Decision::Blocked).tracing_level(), tracing::Level::WARN);
        assert_eq!(AuditEntry::new("e", Decision::Flagged).tracing_level(), tracing::Level::INFO);
        assert_eq!(AuditEntry::new("e", Decision::Allowed).tracing_level(), tracing::Level::DEBUG);
    }
}
