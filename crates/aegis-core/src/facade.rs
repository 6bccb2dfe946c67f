//! # The Aegis Facade
//!
//! The top-level aggregate: one Input Scanner, one Trajectory Analyzer, one
//! Audit log, and one [`SessionHandle`] per session id (each handle owning
//! its own `SessionState` and `ActionValidator`, so rate-limit counters,
//! denial-of-wallet counters, and read-data fingerprints are exclusively
//! owned by the session that accumulated them). Components never reference
//! each other directly - the facade passes audit entries and violations
//! downward through plain function calls rather than handing components a
//! shared reference to the log.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;

use aegis_audit::{AuditEntry, AuditLevel, AuditLog, Decision};
use aegis_scanner::models::{ScanResult, Sensitivity};
use aegis_scanner::scanner::{InputScanner, ScannerConfig};
use aegis_stream::monitor::StreamMonitor;
use aegis_trajectory::{Message, Role, TrajectoryAnalyzer};
use aegis_validator::validator::{ActionRequest, ActionValidationResult, ActionValidator};

use crate::config::Policy;
use crate::error::{AegisError, Result};
use crate::session::{SessionState, DEFAULT_DECAY_SCHEDULE, DEFAULT_RISK_BUDGET};

/// Which messages `guard_input` selects out of the full history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    LastUser,
    AllUser,
    FullHistory,
}

/// A handler invoked once by the `auto-retry` recovery mode. Receives the
/// blocked messages and the scan result that blocked them, returns a
/// replacement set of messages to re-scan at paranoid sensitivity.
pub type AutoRetryFuture = Pin<Box<dyn Future<Output = Vec<Message>> + Send>>;
pub type AutoRetryHandler = Arc<dyn Fn(&[Message], &ScanResult) -> AutoRetryFuture + Send + Sync>;

/// What `guard_input` does with a failing scan. `AutoRetry` is opt-in: it
/// must be constructed with an explicit handler, there is no default one.
#[derive(Clone)]
pub enum RecoveryMode {
    Continue,
    ResetLast,
    QuarantineSession,
    TerminateSession,
    AutoRetry(AutoRetryHandler),
}

impl std::fmt::Debug for RecoveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryMode::Continue => write!(f, "RecoveryMode::Continue"),
            RecoveryMode::ResetLast => write!(f, "RecoveryMode::ResetLast"),
            RecoveryMode::QuarantineSession => write!(f, "RecoveryMode::QuarantineSession"),
            RecoveryMode::TerminateSession => write!(f, "RecoveryMode::TerminateSession"),
            RecoveryMode::AutoRetry(_) => write!(f, "RecoveryMode::AutoRetry(<handler>)"),
        }
    }
}

impl Default for RecoveryMode {
    fn default() -> Self {
        RecoveryMode::QuarantineSession
    }
}

/// Per-step options for `guard_chain_step`.
#[derive(Debug, Clone)]
pub struct ChainStepOptions {
    pub max_steps: u32,
    pub risk_budget: f64,
}

impl Default for ChainStepOptions {
    fn default() -> Self {
        Self { max_steps: 25, risk_budget: DEFAULT_RISK_BUDGET }
    }
}

/// Outcome of one `guard_chain_step` call.
#[derive(Debug, Clone)]
pub struct ChainStepOutcome {
    pub scan_result: ScanResult,
    pub halted: bool,
    pub available_tools: Vec<String>,
}

/// A session's owned state plus the validator instance enforcing its
/// rate limits, denial-of-wallet caps, and exfiltration fingerprints.
pub struct SessionHandle {
    pub state: SessionState,
    pub validator: ActionValidator,
}

impl SessionHandle {
    fn new(policy: &Policy) -> Result<Self> {
        Ok(Self { state: SessionState::new(), validator: ActionValidator::new(policy.action.clone())? })
    }
}

pub struct Aegis {
    policy: Policy,
    scanner: InputScanner,
    trajectory: TrajectoryAnalyzer,
    audit: AuditLog,
    recovery: RecoveryMode,
    sessions: StdMutex<HashMap<String, Arc<AsyncMutex<SessionHandle>>>>,
}

impl Aegis {
    pub fn new(policy: Policy) -> Result<Self> {
        let scanner = InputScanner::with_config(policy.input.scanner.clone())?;
        Ok(Self {
            policy,
            scanner,
            trajectory: TrajectoryAnalyzer::new(),
            audit: AuditLog::new(AuditLevel::All),
            recovery: RecoveryMode::default(),
            sessions: StdMutex::new(HashMap::new()),
        })
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_recovery_mode(mut self, recovery: RecoveryMode) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn scanner(&self) -> &InputScanner {
        &self.scanner
    }

    pub fn trajectory(&self) -> &TrajectoryAnalyzer {
        &self.trajectory
    }

    /// Creates a fresh transducer over outbound tokens, configured from the
    /// policy's `output` slice. One per scan session; cheap to create.
    pub fn create_stream_transform(&self) -> Result<StreamMonitor> {
        Ok(StreamMonitor::new(self.policy.output.stream.clone())?)
    }

    fn session_handle(&self, session_id: &str) -> Result<Arc<AsyncMutex<SessionHandle>>> {
        let mut sessions = self.sessions.lock().expect("session map lock poisoned");
        if let Some(handle) = sessions.get(session_id) {
            return Ok(handle.clone());
        }
        let handle = Arc::new(AsyncMutex::new(SessionHandle::new(&self.policy)?));
        sessions.insert(session_id.to_string(), handle.clone());
        Ok(handle)
    }

    /// Scans `messages` per `strategy`, merges the per-message results, and
    /// applies the active recovery mode on a failing score.
    pub async fn guard_input(
        &self,
        session_id: &str,
        messages: &[Message],
        strategy: ScanStrategy,
    ) -> Result<Vec<Message>> {
        let handle = self.session_handle(session_id)?;
        let mut guard = handle.lock().await;

        match guard.state.status {
            crate::session::SessionStatus::Terminated => {
                return Err(AegisError::SessionTerminated { session_id: session_id.to_string(), scan_result: None })
            }
            crate::session::SessionStatus::Quarantined => {
                return Err(AegisError::SessionQuarantined(session_id.to_string()))
            }
            crate::session::SessionStatus::Active => {}
        }

        let selected = select_messages(messages, strategy);
        if selected.is_empty() {
            return Ok(messages.to_vec());
        }

        let results: Vec<ScanResult> = selected.iter().map(|m| self.scanner.scan_str(&m.content)).collect();
        let merged = merge_results(results);
        guard.state.record_risk(merged.score);

        if merged.safe {
            self.audit.log(
                AuditEntry::new("scan_pass", Decision::Allowed)
                    .with_session(session_id)
                    .with_context("score", format!("{:.2}", merged.score)),
            );
            return Ok(messages.to_vec());
        }

        self.audit.log(
            AuditEntry::new("scan_block", Decision::Blocked)
                .with_session(session_id)
                .with_reason(format!("score {:.2} at or above threshold", merged.score))
                .with_context("detections", merged.detections.len().to_string()),
        );

        match &self.recovery {
            RecoveryMode::Continue => Ok(messages.to_vec()),
            RecoveryMode::ResetLast => {
                let mut trimmed = messages.to_vec();
                trimmed.pop();
                Ok(trimmed)
            }
            RecoveryMode::QuarantineSession => {
                guard.state.quarantine();
                tracing::warn!(session_id, score = merged.score, "session quarantined on scan block");
                Err(AegisError::InputBlocked { scan_result: Box::new(merged) })
            }
            RecoveryMode::TerminateSession => {
                guard.state.terminate();
                tracing::warn!(session_id, score = merged.score, "session terminated on scan block");
                Err(AegisError::SessionTerminated {
                    session_id: session_id.to_string(),
                    scan_result: Some(Box::new(merged)),
                })
            }
            RecoveryMode::AutoRetry(handler) => {
                let retried = handler(messages, &merged).await;
                let paranoid = InputScanner::with_config(ScannerConfig {
                    sensitivity: Sensitivity::Paranoid,
                    ..self.policy.input.scanner.clone()
                })?;
                let retry_selected = select_messages(&retried, strategy);
                if retry_selected.is_empty() {
                    return Ok(retried);
                }
                let retry_results: Vec<ScanResult> =
                    retry_selected.iter().map(|m| paranoid.scan_str(&m.content)).collect();
                let retry_merged = merge_results(retry_results);
                if retry_merged.safe {
                    self.audit.log(
                        AuditEntry::new("scan_pass", Decision::Allowed)
                            .with_session(session_id)
                            .with_context("auto_retry", "true"),
                    );
                    Ok(retried)
                } else {
                    Err(AegisError::InputBlocked { scan_result: Box::new(retry_merged) })
                }
            }
        }
    }

    /// The agentic loop's per-step gate: scans `tool_output` as untrusted
    /// content, accumulates risk, and decays the available tool set per the
    /// step schedule.
    pub async fn guard_chain_step(
        &self,
        session_id: &str,
        tool_output: &str,
        initial_tools: &[String],
        opts: ChainStepOptions,
    ) -> Result<ChainStepOutcome> {
        let handle = self.session_handle(session_id)?;
        let mut guard = handle.lock().await;

        match guard.state.status {
            crate::session::SessionStatus::Terminated => {
                return Err(AegisError::SessionTerminated { session_id: session_id.to_string(), scan_result: None })
            }
            crate::session::SessionStatus::Quarantined => {
                return Err(AegisError::SessionQuarantined(session_id.to_string()))
            }
            crate::session::SessionStatus::Active => {}
        }

        let scan_result = self.scanner.scan_str(tool_output);
        guard.state.step_count += 1;
        guard.state.record_risk(scan_result.score);

        let halted = guard.state.step_count > opts.max_steps || guard.state.cumulative_risk > opts.risk_budget;
        let fraction = SessionState::privilege_fraction(guard.state.step_count, DEFAULT_DECAY_SCHEDULE);
        let retained = ((initial_tools.len() as f64) * fraction).floor() as usize;
        let available_tools = initial_tools[..retained.min(initial_tools.len())].to_vec();

        self.audit.log(
            AuditEntry::new("chain_step", if halted { Decision::Blocked } else { Decision::Info })
                .with_session(session_id)
                .with_context("step", guard.state.step_count.to_string())
                .with_context("cumulative_risk", format!("{:.2}", guard.state.cumulative_risk)),
        );

        Ok(ChainStepOutcome { scan_result, halted, available_tools })
    }

    /// Runs the Action Validator's deny-pipeline for `request` under
    /// `session_id`'s own rate-limit/DoW/fingerprint state.
    pub async fn validate_action(&self, session_id: &str, request: ActionRequest) -> Result<ActionValidationResult> {
        let handle = self.session_handle(session_id)?;
        let guard = handle.lock().await;
        Ok(guard.validator.check(request).await)
    }
}

fn select_messages(messages: &[Message], strategy: ScanStrategy) -> Vec<Message> {
    match strategy {
        ScanStrategy::LastUser => messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .cloned()
            .into_iter()
            .collect(),
        ScanStrategy::AllUser => messages.iter().filter(|m| m.role == Role::User).cloned().collect(),
        ScanStrategy::FullHistory => messages.to_vec(),
    }
}

/// Combines per-message scan results into one: detections concatenated,
/// score the worst individual score (for reporting), safe only if every
/// scanned message was individually safe.
fn merge_results(results: Vec<ScanResult>) -> ScanResult {
    let mut iter = results.into_iter();
    let mut merged = iter.next().expect("merge_results called with no results");
    let mut safe = merged.safe;
    let mut max_score = merged.score;
    for result in iter {
        safe &= result.safe;
        max_score = max_score.max(result.score);
        merged.detections.extend(result.detections);
    }
    merged.safe = safe;
    merged.score = max_score;
    merged
}
