//! # Action Validator
//!
//! The pre-execution gate for proposed tool invocations. Runs a
//! short-circuiting pipeline - policy, rate limit, denial-of-wallet,
//! parameter safety, MCP parameter scan, exfiltration check - then, for
//! actions requiring it, suspends on a human-approval callback. Every deny
//! is returned as data; nothing in the happy or unhappy path throws.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;

use crate::error::{Result, ValidatorError};
use crate::exfiltration::{is_exfiltration_tool, FingerprintStore};
use crate::limits::{DenialOfWalletTracker, DowCounter, RateLimiter};
use crate::params::{check_parameter_safety, scan_mcp_parameters};
use crate::policy::ActionPolicy;
use aegis_scanner::models::ScannerError;
use aegis_scanner::scanner::InputScanner;

/// A boxed future resolving to whether a human approved the action.
pub type ApprovalFuture = Pin<Box<dyn Future<Output = bool> + Send>>;
pub type ApprovalCallback = Arc<dyn Fn(&ActionRequest) -> ApprovalFuture + Send + Sync>;

/// The tool call an agent is about to make.
#[derive(Debug, Clone)]
pub struct ProposedAction {
    pub tool: String,
    pub params: HashMap<String, Value>,
}

/// One request to the validator.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub original_request: String,
    pub proposed_action: ProposedAction,
    pub previous_tool_output: Option<String>,
}

/// Outcome of [`ActionValidator::check`]. Never an error; denials are data.
#[derive(Debug, Clone)]
pub struct ActionValidationResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub requires_approval: bool,
    pub awaited_approval: Option<bool>,
}

impl ActionValidationResult {
    fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()), requires_approval: false, awaited_approval: None }
    }

    fn allow() -> Self {
        Self { allowed: true, reason: None, requires_approval: false, awaited_approval: None }
    }
}

pub struct ActionValidator {
    policy: ActionPolicy,
    scanner: Option<InputScanner>,
    rate_limiter: Mutex<RateLimiter>,
    dow_tracker: Mutex<DenialOfWalletTracker>,
    fingerprints: Mutex<FingerprintStore>,
    approval: Option<ApprovalCallback>,
}

impl ActionValidator {
    pub fn new(policy: ActionPolicy) -> Result<Self> {
        let scanner = if policy.mcp_parameter_scan {
            Some(InputScanner::new().map_err(|e| {
                let ScannerError::InvalidPattern { name, source } = e;
                ValidatorError::InvalidPolicyPattern { pattern: name, reason: source.to_string() }
            })?)
        } else {
            None
        };
        Ok(Self {
            policy,
            scanner,
            rate_limiter: Mutex::new(RateLimiter::new()),
            dow_tracker: Mutex::new(DenialOfWalletTracker::new(Instant::now())),
            fingerprints: Mutex::new(FingerprintStore::new()),
            approval: None,
        })
    }

    pub fn policy(&self) -> &ActionPolicy {
        &self.policy
    }

    /// Registers the async human-approval callback invoked for actions the
    /// policy flags with `requireApproval`.
    pub fn set_approval_callback(
        &mut self,
        cb: impl Fn(&ActionRequest) -> ApprovalFuture + Send + Sync + 'static,
    ) {
        self.approval = Some(Arc::new(cb));
    }

    /// Records that a sandboxed execution path was taken, against the
    /// denial-of-wallet sandbox-trigger cap. Call sites outside this crate
    /// (e.g. an orchestrator routing a risky action through a sandbox)
    /// drive this; the validator itself never triggers a sandbox.
    pub fn record_sandbox_trigger(&self) {
        let now = Instant::now();
        let mut dow = self.dow_tracker.lock().unwrap();
        dow.record(&self.policy.denial_of_wallet, now, DowCounter::SandboxTriggers);
    }

    pub fn can_afford_sandbox_trigger(&self) -> bool {
        let now = Instant::now();
        let mut dow = self.dow_tracker.lock().unwrap();
        dow.can_afford(&self.policy.denial_of_wallet, now, DowCounter::SandboxTriggers)
    }

    /// Runs the full deny-pipeline against `request`.
    pub async fn check(&self, request: ActionRequest) -> ActionValidationResult {
        let tool = request.proposed_action.tool.as_str();
        let now = Instant::now();

        if self.policy.capabilities.is_denied(tool) {
            tracing::warn!(tool, "action_block: tool explicitly denied by policy");
            return ActionValidationResult::deny(format!("tool `{tool}` is explicitly denied by policy"));
        }
        if !self.policy.capabilities.is_allowed(tool) {
            tracing::warn!(tool, "action_block: tool not in allow list");
            return ActionValidationResult::deny(format!("tool `{tool}` is not in the policy allow list"));
        }
        let requires_approval = self.policy.capabilities.requires_approval(tool);

        if let Some(limit) = self.policy.limits.get(tool).copied() {
            let mut limiter = self.rate_limiter.lock().unwrap();
            if !limiter.check_and_record(tool, limit, now) {
                tracing::warn!(tool, "action_block: rate limit exceeded");
                return ActionValidationResult::deny(format!("rate limit exceeded for tool `{tool}`"));
            }
        }

        {
            let mut dow = self.dow_tracker.lock().unwrap();
            if !dow.can_afford(&self.policy.denial_of_wallet, now, DowCounter::TotalOperations) {
                tracing::warn!(tool, "denial_of_wallet: total operation budget exhausted");
                return ActionValidationResult::deny("denial-of-wallet: total operation budget exhausted");
            }
            if !dow.can_afford(&self.policy.denial_of_wallet, now, DowCounter::ToolCalls) {
                tracing::warn!(tool, "denial_of_wallet: tool-call budget exhausted");
                return ActionValidationResult::deny("denial-of-wallet: tool-call budget exhausted");
            }
        }

        if let Some(unsafe_param) = check_parameter_safety(&request.proposed_action.params) {
            tracing::warn!(tool, path = %unsafe_param.path, "action_block: unsafe parameter");
            return ActionValidationResult::deny(format!(
                "unsafe parameter `{}`: {}",
                unsafe_param.path, unsafe_param.reason
            ));
        }

        if let Some(scanner) = &self.scanner {
            for (key, value) in &request.proposed_action.params {
                if let Some(finding) = scan_mcp_parameters(scanner, value, key) {
                    tracing::warn!(tool, path = %finding.path, "action_block: unsafe MCP parameter");
                    return ActionValidationResult::deny(format!(
                        "unsafe MCP parameter at `{}`: {}",
                        finding.path, finding.reason
                    ));
                }
            }
        }

        if self.policy.data_flow.no_exfiltration
            && is_exfiltration_tool(tool, &self.policy.data_flow.exfiltration_tool_patterns)
        {
            let fingerprints = self.fingerprints.lock().unwrap();
            let leaked = request
                .proposed_action
                .params
                .values()
                .filter_map(|v| v.as_str())
                .any(|text| fingerprints.find_leaked_fingerprint(text).is_some());
            if leaked {
                tracing::warn!(tool, "action_block: exfiltration attempt");
                return ActionValidationResult::deny(format!(
                    "tool `{tool}` parameter matches previously read data; blocked to prevent exfiltration"
                ));
            }
        }

        {
            let mut dow = self.dow_tracker.lock().unwrap();
            dow.record(&self.policy.denial_of_wallet, now, DowCounter::TotalOperations);
            dow.record(&self.policy.denial_of_wallet, now, DowCounter::ToolCalls);
        }
        if let Some(output) = &request.previous_tool_output {
            self.fingerprints.lock().unwrap().record(output);
        }

        if requires_approval {
            return self.await_approval(request).await;
        }

        tracing::debug!(tool, "action_approve");
        ActionValidationResult::allow()
    }

    async fn await_approval(&self, request: ActionRequest) -> ActionValidationResult {
        let Some(callback) = &self.approval else {
            tracing::warn!(
                tool = request.proposed_action.tool,
                "action_block: approval required but no callback configured"
            );
            return ActionValidationResult {
                allowed: false,
                reason: Some("approval required but no approval callback configured".to_string()),
                requires_approval: true,
                awaited_approval: None,
            };
        };

        let approved = callback(&request).await;
        if approved {
            tracing::debug!(tool = request.proposed_action.tool, "action_approve: approved by callback");
            ActionValidationResult {
                allowed: true,
                reason: None,
                requires_approval: true,
                awaited_approval: Some(true),
            }
        } else {
            tracing::warn!(tool = request.proposed_action.tool, "action_block: denied by approval callback");
            ActionValidationResult {
                allowed: false,
                reason: Some("action denied by approval callback".to_string()),
                requires_approval: true,
                awaited_approval: Some(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(tool: &str, params: &[(&str, Value)]) -> ActionRequest {
        ActionRequest {
            original_request: "do the thing".to_string(),
            proposed_action: ProposedAction {
                tool: tool.to_string(),
                params: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            },
            previous_tool_output: None,
        }
    }

    #[tokio::test]
    async fn denies_tool_not_in_allow_list() {
        let mut policy = ActionPolicy::default();
        policy.capabilities.allow = vec!["read_*".to_string()];
        let validator = ActionValidator::new(policy).unwrap();
        let result = validator.check(request("delete_account", &[])).await;
        assert!(!result.allowed);
    }

    #[tokio::test]
    async fn denies_explicitly_denied_tool() {
        let mut policy = ActionPolicy::default();
        policy.capabilities.deny = vec!["delete_*".to_string()];
        let validator = ActionValidator::new(policy).unwrap();
        let result = validator.check(request("delete_account", &[])).await;
        assert!(!result.allowed);
    }

    #[tokio::test]
    async fn allows_clean_action_by_default() {
        let validator = ActionValidator::new(ActionPolicy::default()).unwrap();
        let result = validator.check(request("read_file", &[("path", json!("/tmp/a.txt"))])).await;
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn rate_limit_denies_after_max() {
        let mut policy = ActionPolicy::default();
        policy.limits.insert("read_file".to_string(), crate::policy::RateLimit::parse(1, "60s").unwrap());
        let validator = ActionValidator::new(policy).unwrap();
        assert!(validator.check(request("read_file", &[])).await.allowed);
        assert!(!validator.check(request("read_file", &[])).await.allowed);
    }

    #[tokio::test]
    async fn denial_of_wallet_denies_after_cap() {
        let mut policy = ActionPolicy::default();
        policy.denial_of_wallet.max_tool_calls = 1;
        let validator = ActionValidator::new(policy).unwrap();
        assert!(validator.check(request("read_file", &[])).await.allowed);
        assert!(!validator.check(request("write_file", &[])).await.allowed);
    }

    #[tokio::test]
    async fn unsafe_shell_command_denied() {
        let validator = ActionValidator::new(ActionPolicy::default()).unwrap();
        let result = validator
            .check(request("run_shell", &[("command", json!("ls; rm -rf /"))]))
            .await;
        assert!(!result.allowed);
    }

    #[tokio::test]
    async fn exfiltration_blocks_reuse_of_read_data() {
        let validator = ActionValidator::new(ActionPolicy::default()).unwrap();
        let mut read_request = request("read_file", &[]);
        read_request.previous_tool_output = None;
        assert!(validator.check(read_request).await.allowed);

        let mut send_request = request("send_email", &[("body", json!("irrelevant"))]);
        send_request.previous_tool_output =
            Some("a secret document line that is definitely long enough".to_string());
        // Record the read first via a pass-through read call carrying the output.
        let mut carrier = request("read_file", &[]);
        carrier.previous_tool_output =
            Some("a secret document line that is definitely long enough".to_string());
        assert!(validator.check(carrier).await.allowed);

        let mut leak_request = request(
            "send_email",
            &[("body", json!("a secret document line that is definitely long enough and more"))],
        );
        leak_request.previous_tool_output = None;
        let result = validator.check(leak_request).await;
        assert!(!result.allowed);
    }

    #[tokio::test]
    async fn approval_required_and_granted() {
        let mut policy = ActionPolicy::default();
        policy.capabilities.require_approval = vec!["send_*".to_string()];
        let mut validator = ActionValidator::new(policy).unwrap();
        validator.set_approval_callback(|_req| Box::pin(async { true }));
        let result = validator.check(request("send_email", &[])).await;
        assert!(result.allowed);
        assert_eq!(result.awaited_approval, Some(true));
    }

    #[tokio::test]
    async fn approval_required_and_denied() {
        let mut policy = ActionPolicy::default();
        policy.capabilities.require_approval = vec!["send_*".to_string()];
        let mut validator = ActionValidator::new(policy).unwrap();
        validator.set_approval_callback(|_req| Box::pin(async { false }));
        let result = validator.check(request("send_email", &[])).await;
        assert!(!result.allowed);
        assert_eq!(result.awaited_approval, Some(false));
    }

    #[tokio::test]
    async fn approval_required_without_callback_denies() {
        let mut policy = ActionPolicy::default();
        policy.capabilities.require_approval = vec!["send_*".to_string()];
        let validator = ActionValidator::new(policy).unwrap();
        let result = validator.check(request("send_email", &[])).await;
        assert!(!result.allowed);
        assert!(result.requires_approval);
    }
}
