//! # Session State
//!
//! Per-session record the orchestrator mutates across a conversation:
//! lifecycle status, cumulative risk, and the step counter the agentic-loop
//! gate decays privileges against. The per-tool rate-limit counters,
//! denial-of-wallet counters, and read-data fingerprints named in the
//! session data model live on the [`crate::facade::SessionHandle`]'s own
//! [`aegis_validator::ActionValidator`] instance - one validator per
//! session, so those counters are exclusively owned the same way this
//! state is.

use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle status a session can be in. Once `Quarantined` or
/// `Terminated`, a session never returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Quarantined,
    Terminated,
}

/// Step-count thresholds and the tool-set fraction retained past each,
/// applied in `guard_chain_step`'s privilege decay.
pub const DEFAULT_DECAY_SCHEDULE: &[(u32, f64)] = &[(10, 0.75), (15, 0.5), (20, 0.25)];

/// Cumulative risk budget above which `guard_chain_step` halts the loop.
pub const DEFAULT_RISK_BUDGET: f64 = 3.0;

/// Mutable state for one conversation. Guarded by a `tokio::sync::Mutex`
/// at the call site (one writer per session); this type itself holds no
/// lock, matching the "actor-style owned-handle" option alongside the
/// per-session-mutex option.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub status: SessionStatus,
    pub cumulative_risk: f64,
    pub step_count: u32,
    pub audit_correlation_id: String,
    pub created_at: OffsetDateTime,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: SessionStatus::Active,
            cumulative_risk: 0.0,
            step_count: 0,
            audit_correlation_id: Uuid::new_v4().to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::new() }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn quarantine(&mut self) {
        self.status = SessionStatus::Quarantined;
    }

    pub fn terminate(&mut self) {
        self.status = SessionStatus::Terminated;
    }

    pub fn record_risk(&mut self, risk: f64) {
        self.cumulative_risk += risk;
    }

    /// Fraction of the initial tool set still available at `step`, per the
    /// privilege-decay schedule: 75% past step 10, 50% past step 15, 25%
    /// past step 20, 100% before that.
    pub fn privilege_fraction(step: u32, schedule: &[(u32, f64)]) -> f64 {
        schedule
            .iter()
            .filter(|(threshold, _)| step > *threshold)
            .map(|(_, fraction)| *fraction)
            .fold(1.0, f64::min)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
