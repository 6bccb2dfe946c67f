//! # Action Policy
//!
//! The slice of the workspace-wide policy document the Action Validator
//! enforces: capability allow/deny/approval lists, per-tool rate limits,
//! denial-of-wallet caps, and the data-flow exfiltration rule. `aegis-core`
//! composes this alongside the Input Scanner's and Stream Monitor's own
//! config slices into one top-level policy.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Result, ValidatorError};

/// Tool-name allow/deny/approval lists. Glob patterns, matched with
/// [`glob_match`].
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub require_approval: Vec<String>,
}

impl Capabilities {
    pub fn is_denied(&self, tool: &str) -> bool {
        self.deny.iter().any(|p| glob_match(p, tool))
    }

    /// An empty `allow` list means every non-denied tool is allowed.
    pub fn is_allowed(&self, tool: &str) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|p| glob_match(p, tool))
    }

    pub fn requires_approval(&self, tool: &str) -> bool {
        self.require_approval.iter().any(|p| glob_match(p, tool))
    }
}

/// A fixed-window rate limit: at most `max` calls per `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max: u32,
    pub window: Duration,
}

impl RateLimit {
    /// Parses a `"{integer}{s|m|h|d}"` window spec, e.g. `"60s"`, `"5m"`, `"1h"`.
    pub fn parse(max: u32, spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.len() < 2 {
            return Err(ValidatorError::InvalidRateLimitSpec(spec.to_string()));
        }
        let (num, unit) = spec.split_at(spec.len() - 1);
        let amount: u64 = num
            .parse()
            .map_err(|_| ValidatorError::InvalidRateLimitSpec(spec.to_string()))?;
        let secs = match unit {
            "s" => amount,
            "m" => amount * 60,
            "h" => amount * 3600,
            "d" => amount * 86400,
            _ => return Err(ValidatorError::InvalidRateLimitSpec(spec.to_string())),
        };
        Ok(Self { max, window: Duration::from_secs(secs) })
    }
}

/// Rolling-window caps on per-session resource consumption.
#[derive(Debug, Clone, Copy)]
pub struct DenialOfWalletCaps {
    pub max_total_operations: u32,
    pub max_tool_calls: u32,
    pub max_sandbox_triggers: u32,
    pub window: Duration,
}

impl Default for DenialOfWalletCaps {
    fn default() -> Self {
        Self {
            max_total_operations: 100,
            max_tool_calls: 50,
            max_sandbox_triggers: 10,
            window: Duration::from_secs(5 * 60),
        }
    }
}

/// Default tool-name patterns treated as external-destination (exfiltration
/// candidate) tools.
pub const DEFAULT_EXFIL_PATTERNS: &[&str] = &[
    "send_*", "email_*", "post_*", "upload_*", "transmit_*", "webhook_*", "http_*", "fetch_*",
    "curl_*", "network_*", "export_*",
];

#[derive(Debug, Clone)]
pub struct DataFlowPolicy {
    pub no_exfiltration: bool,
    pub exfiltration_tool_patterns: Vec<String>,
}

impl Default for DataFlowPolicy {
    fn default() -> Self {
        Self {
            no_exfiltration: true,
            exfiltration_tool_patterns: DEFAULT_EXFIL_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionPolicy {
    pub capabilities: Capabilities,
    /// Per-tool rate limits, keyed by tool name (not glob-matched).
    pub limits: HashMap<String, RateLimit>,
    pub denial_of_wallet: DenialOfWalletCaps,
    pub data_flow: DataFlowPolicy,
    /// Whether proposed-action parameters are recursively scanned with the
    /// Input Scanner in addition to the fixed keyword denylists.
    pub mcp_parameter_scan: bool,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            limits: HashMap::new(),
            denial_of_wallet: DenialOfWalletCaps::default(),
            data_flow: DataFlowPolicy::default(),
            mcp_parameter_scan: true,
        }
    }
}

impl ActionPolicy {
    /// Only explicitly allowed tools run; exfiltration-shaped tools always
    /// require approval.
    pub fn strict() -> Self {
        let mut policy = Self::default();
        policy.capabilities.require_approval =
            DEFAULT_EXFIL_PATTERNS.iter().map(|s| s.to_string()).collect();
        policy
    }

    pub fn balanced() -> Self {
        Self::default()
    }

    /// Drops the exfiltration check and MCP parameter scan; keeps policy
    /// and rate-limit enforcement.
    pub fn permissive() -> Self {
        let mut policy = Self::default();
        policy.data_flow.no_exfiltration = false;
        policy.mcp_parameter_scan = false;
        policy
    }

    /// Tightened denial-of-wallet caps on top of `strict`.
    pub fn paranoid() -> Self {
        let mut policy = Self::strict();
        policy.denial_of_wallet = DenialOfWalletCaps {
            max_total_operations: 25,
            max_tool_calls: 10,
            max_sandbox_triggers: 2,
            window: Duration::from_secs(5 * 60),
        };
        policy
    }

    /// Customer-facing tools (search, ticketing, knowledge-base lookups)
    /// allowed freely; anything exfiltration-shaped still needs approval.
    pub fn customer_support() -> Self {
        let mut policy = Self::default();
        policy.capabilities.require_approval =
            DEFAULT_EXFIL_PATTERNS.iter().map(|s| s.to_string()).collect();
        policy
    }

    /// Code-assistant tools (read/write/search) allowed freely; shell and
    /// network tools require approval.
    pub fn code_assistant() -> Self {
        let mut policy = Self::default();
        policy.capabilities.require_approval = vec![
            "shell_*".to_string(),
            "exec_*".to_string(),
            "run_*".to_string(),
        ];
        policy.capabilities.require_approval.extend(
            DEFAULT_EXFIL_PATTERNS.iter().map(|s| s.to_string()),
        );
        policy
    }
}

/// Glob match supporting a single `*` wildcard: a bare `*`, a `prefix_*`
/// suffix wildcard, or `*` anywhere in the pattern.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    match pattern.find('*') {
        None => pattern == name,
        Some(idx) => {
            let prefix = &pattern[..idx];
            let suffix = &pattern[idx + 1..];
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_match_bare_star_matches_anything() {
        assert!(glob_match("*", "anything"));
    }

    #[test]
    fn glob_match_prefix_wildcard() {
        assert!(glob_match("send_*", "send_email"));
        assert!(!glob_match("send_*", "receive_email"));
    }

    #[test]
    fn glob_match_exact() {
        assert!(glob_match("read_file", "read_file"));
        assert!(!glob_match("read_file", "write_file"));
    }

    #[test]
    fn rate_limit_parses_units() {
        assert_eq!(RateLimit::parse(10, "30s").unwrap().window, Duration::from_secs(30));
        assert_eq!(RateLimit::parse(10, "5m").unwrap().window, Duration::from_secs(300));
        assert_eq!(RateLimit::parse(10, "2h").unwrap().window, Duration::from_secs(7200));
        assert_eq!(RateLimit::parse(10, "1d").unwrap().window, Duration::from_secs(86400));
    }

    #[test]
    fn rate_limit_rejects_bad_unit() {
        assert!(RateLimit::parse(10, "5x").is_err());
    }

    #[test]
    fn empty_allow_list_allows_all_non_denied() {
        let caps = Capabilities::default();
        assert!(caps.is_allowed("anything"));
    }

    #[test]
    fn deny_wins_over_allow() {
        let mut caps = Capabilities::default();
        caps.allow.push("*".to_string());
        caps.deny.push("delete_*".to_string());
        assert!(caps.is_denied("delete_account"));
    }
}
