//! # Policy Configuration
//!
//! The top-level [`Policy`] aggregate composes each component crate's own
//! config type plus the handful of fields no sub-crate owns (input length
//! caps, output redaction patterns, alignment strictness). Policies are
//! constructed directly in code via the named presets, or loaded from a
//! disk document (JSON via `serde_json`, YAML via the narrow [`yaml`]
//! subset parser) through [`PolicyDocument`].

pub mod yaml;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aegis_scanner::models::Sensitivity;
use aegis_scanner::scanner::ScannerConfig;
use aegis_stream::monitor::StreamMonitorConfig;
use aegis_validator::policy::{ActionPolicy, RateLimit};

use crate::error::{AegisError, Result};

/// The `input` slice of the policy document. Mirrors [`ScannerConfig`] plus
/// the two fields the scanner crate itself has no use for (`maxLength`,
/// `requireQuarantine` are orchestrator-level concerns, not scanner config).
#[derive(Debug, Clone)]
pub struct InputPolicy {
    pub max_length: usize,
    pub block_patterns: Vec<String>,
    pub require_quarantine: bool,
    pub scanner: ScannerConfig,
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self {
            max_length: 50_000,
            block_patterns: Vec::new(),
            require_quarantine: true,
            scanner: ScannerConfig::default(),
        }
    }
}

/// The `output` slice of the policy document, layered over [`StreamMonitorConfig`].
#[derive(Debug, Clone)]
pub struct OutputPolicy {
    pub max_length: usize,
    pub block_patterns: Vec<String>,
    pub redact_patterns: Vec<String>,
    pub block_on_leak: bool,
    pub stream: StreamMonitorConfig,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self {
            max_length: 50_000,
            block_patterns: Vec::new(),
            redact_patterns: Vec::new(),
            block_on_leak: true,
            stream: StreamMonitorConfig::default(),
        }
    }
}

/// The `alignment` slice. Strictness reuses the scanner's [`Sensitivity`]
/// scale rather than inventing a parallel one.
#[derive(Debug, Clone)]
pub struct AlignmentPolicy {
    pub enabled: bool,
    pub strictness: Sensitivity,
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        Self { enabled: false, strictness: Sensitivity::Balanced }
    }
}

/// How PII discovered in outbound content is handled at the policy level,
/// independent of the stream monitor's own per-write redaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiHandling {
    Block,
    Redact,
    Allow,
}

#[derive(Debug, Clone)]
pub struct DataFlowSettings {
    pub pii_handling: PiiHandling,
    pub external_data_sources: Vec<String>,
    pub no_exfiltration: bool,
}

impl Default for DataFlowSettings {
    fn default() -> Self {
        Self { pii_handling: PiiHandling::Redact, external_data_sources: Vec::new(), no_exfiltration: true }
    }
}

/// The full runtime policy: one slice per component crate, plus the fields
/// that belong to the orchestrator rather than any single component.
#[derive(Debug, Clone)]
pub struct Policy {
    pub input: InputPolicy,
    pub output: OutputPolicy,
    pub alignment: AlignmentPolicy,
    pub data_flow: DataFlowSettings,
    pub action: ActionPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Policy {
    /// Only explicitly allowed tools run, paranoid scan sensitivity,
    /// exfiltration-shaped tools require approval.
    pub fn strict() -> Self {
        Self {
            input: InputPolicy {
                scanner: ScannerConfig { sensitivity: Sensitivity::Paranoid, ..ScannerConfig::default() },
                ..InputPolicy::default()
            },
            output: OutputPolicy::default(),
            alignment: AlignmentPolicy { enabled: true, strictness: Sensitivity::Paranoid },
            data_flow: DataFlowSettings { pii_handling: PiiHandling::Block, ..DataFlowSettings::default() },
            action: ActionPolicy::strict(),
        }
    }

    pub fn balanced() -> Self {
        Self {
            input: InputPolicy::default(),
            output: OutputPolicy::default(),
            alignment: AlignmentPolicy::default(),
            data_flow: DataFlowSettings::default(),
            action: ActionPolicy::balanced(),
        }
    }

    /// Drops exfiltration checks and PII blocking; keeps pattern detection
    /// at reduced sensitivity.
    pub fn permissive() -> Self {
        Self {
            input: InputPolicy {
                scanner: ScannerConfig { sensitivity: Sensitivity::Permissive, ..ScannerConfig::default() },
                ..InputPolicy::default()
            },
            output: OutputPolicy::default(),
            alignment: AlignmentPolicy::default(),
            data_flow: DataFlowSettings {
                pii_handling: PiiHandling::Allow,
                no_exfiltration: false,
                ..DataFlowSettings::default()
            },
            action: ActionPolicy::permissive(),
        }
    }

    /// Customer-facing tools allowed freely; anything exfiltration-shaped
    /// still needs approval; PII redacted rather than blocked outright.
    pub fn customer_support() -> Self {
        Self {
            input: InputPolicy::default(),
            output: OutputPolicy::default(),
            alignment: AlignmentPolicy::default(),
            data_flow: DataFlowSettings::default(),
            action: ActionPolicy::customer_support(),
        }
    }

    /// Read/write/search tools allowed freely; shell, network, and
    /// exfiltration-shaped tools require approval.
    pub fn code_assistant() -> Self {
        Self {
            input: InputPolicy::default(),
            output: OutputPolicy::default(),
            alignment: AlignmentPolicy::default(),
            data_flow: DataFlowSettings::default(),
            action: ActionPolicy::code_assistant(),
        }
    }

    /// Tightened denial-of-wallet caps and paranoid scanning on top of `strict`.
    pub fn paranoid() -> Self {
        Self {
            input: InputPolicy {
                max_length: 20_000,
                scanner: ScannerConfig { sensitivity: Sensitivity::Paranoid, ..ScannerConfig::default() },
                ..InputPolicy::default()
            },
            output: OutputPolicy::default(),
            alignment: AlignmentPolicy { enabled: true, strictness: Sensitivity::Paranoid },
            data_flow: DataFlowSettings { pii_handling: PiiHandling::Block, ..DataFlowSettings::default() },
            action: ActionPolicy::paranoid(),
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "strict" => Ok(Self::strict()),
            "balanced" => Ok(Self::balanced()),
            "permissive" => Ok(Self::permissive()),
            "customer-support" => Ok(Self::customer_support()),
            "code-assistant" => Ok(Self::code_assistant()),
            "paranoid" => Ok(Self::paranoid()),
            other => Err(AegisError::Config(format!("unknown policy preset `{other}`"))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let doc: PolicyDocument = serde_json::from_str(text).map_err(|e| AegisError::Config(e.to_string()))?;
        doc.into_policy()
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let value = yaml::parse(text)?;
        let doc: PolicyDocument = serde_json::from_value(value).map_err(|e| AegisError::Config(e.to_string()))?;
        doc.into_policy()
    }
}

/// Plain, serde-friendly mirror of [`Policy`] used only for on-disk
/// documents. Kept separate from the runtime aggregate because
/// [`ActionPolicy`] and [`StreamMonitorConfig`] don't derive `Deserialize`
/// themselves - this struct is the schema, [`PolicyDocument::into_policy`]
/// is the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub version: u32,
    #[serde(default)]
    pub capabilities: CapabilitiesDocument,
    #[serde(default)]
    pub limits: HashMap<String, String>,
    #[serde(default)]
    pub input: InputDocument,
    #[serde(default)]
    pub output: OutputDocument,
    #[serde(default)]
    pub alignment: AlignmentDocument,
    #[serde(default)]
    pub data_flow: DataFlowDocument,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesDocument {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub require_approval: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDocument {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub block_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub require_quarantine: bool,
    #[serde(default = "default_true")]
    pub encoding_normalization: bool,
    #[serde(default)]
    pub sensitivity: Option<Sensitivity>,
}

impl Default for InputDocument {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            block_patterns: Vec::new(),
            require_quarantine: true,
            encoding_normalization: true,
            sensitivity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub block_patterns: Vec<String>,
    #[serde(default)]
    pub redact_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub detect_pii: bool,
    #[serde(default = "default_true")]
    pub detect_canary: bool,
    #[serde(default = "default_true")]
    pub block_on_leak: bool,
    #[serde(default = "default_true")]
    pub detect_injection_payloads: bool,
    #[serde(default = "default_true")]
    pub sanitize_markdown: bool,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            block_patterns: Vec::new(),
            redact_patterns: Vec::new(),
            detect_pii: true,
            detect_canary: true,
            block_on_leak: true,
            detect_injection_payloads: true,
            sanitize_markdown: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentDocument {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strictness: Option<Sensitivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowDocument {
    #[serde(default = "default_pii_handling")]
    pub pii_handling: PiiHandling,
    #[serde(default)]
    pub external_data_sources: Vec<String>,
    #[serde(default = "default_true")]
    pub no_exfiltration: bool,
}

impl Default for DataFlowDocument {
    fn default() -> Self {
        Self { pii_handling: default_pii_handling(), external_data_sources: Vec::new(), no_exfiltration: true }
    }
}

fn default_max_length() -> usize {
    50_000
}

fn default_true() -> bool {
    true
}

fn default_pii_handling() -> PiiHandling {
    PiiHandling::Redact
}

impl PolicyDocument {
    pub fn into_policy(self) -> Result<Policy> {
        if self.version != 1 {
            return Err(AegisError::Config(format!("unsupported policy version {}", self.version)));
        }

        let mut limits = HashMap::new();
        for (tool, spec) in &self.limits {
            let (max_str, window) = spec
                .split_once('/')
                .ok_or_else(|| AegisError::Config(format!("limit for `{tool}` must be `max/window`, got `{spec}`")))?;
            let max: u32 = max_str
                .trim()
                .parse()
                .map_err(|_| AegisError::Config(format!("invalid rate limit max in `{spec}`")))?;
            let limit = RateLimit::parse(max, window).map_err(|e| AegisError::Config(e.to_string()))?;
            limits.insert(tool.clone(), limit);
        }

        let mut action = ActionPolicy::default();
        action.capabilities.allow = self.capabilities.allow;
        action.capabilities.deny = self.capabilities.deny;
        action.capabilities.require_approval = self.capabilities.require_approval;
        action.limits = limits;
        action.data_flow.no_exfiltration = self.data_flow.no_exfiltration;

        let sensitivity = self.input.sensitivity.unwrap_or_default();
        let scanner = ScannerConfig {
            sensitivity,
            encoding_normalization: self.input.encoding_normalization,
            ..ScannerConfig::default()
        };

        let stream = StreamMonitorConfig {
            detect_pii: self.output.detect_pii,
            pii_redaction: matches!(self.data_flow.pii_handling, PiiHandling::Redact),
            detect_secrets: true,
            detect_injection_payloads: self.output.detect_injection_payloads,
            sanitize_markdown: self.output.sanitize_markdown,
            ..StreamMonitorConfig::default()
        };

        Ok(Policy {
            input: InputPolicy {
                max_length: self.input.max_length,
                block_patterns: self.input.block_patterns,
                require_quarantine: self.input.require_quarantine,
                scanner,
            },
            output: OutputPolicy {
                max_length: self.output.max_length,
                block_patterns: self.output.block_patterns,
                redact_patterns: self.output.redact_patterns,
                block_on_leak: self.output.block_on_leak,
                stream,
            },
            alignment: AlignmentPolicy {
                enabled: self.alignment.enabled,
                strictness: self.alignment.strictness.unwrap_or(sensitivity),
            },
            data_flow: DataFlowSettings {
                pii_handling: self.data_flow.pii_handling,
                external_data_sources: self.data_flow.external_data_sources,
                no_exfiltration: self.data_flow.no_exfiltration,
            },
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_lookup_resolves_known_names() {
        assert!(Policy::preset("strict").is_ok());
        assert!(Policy::preset("paranoid").is_ok());
        assert!(Policy::preset("nonexistent").is_err());
    }

    #[test]
    fn strict_preset_uses_paranoid_sensitivity() {
        let policy = Policy::strict();
        assert_eq!(policy.input.scanner.sensitivity, Sensitivity::Paranoid);
    }

    #[test]
    fn loads_json_policy_document() {
        let json = r#"{
            "version": 1,
            "capabilities": {"allow": ["read_*"], "deny": [], "requireApproval": []},
            "limits": {"read_file": "10/1m"},
            "input": {"maxLength": 1000}
        }"#;
        let policy = Policy::from_json(json).unwrap();
        assert_eq!(policy.action.capabilities.allow, vec!["read_*".to_string()]);
        assert_eq!(policy.input.max_length, 1000);
        assert_eq!(policy.action.limits.get("read_file").unwrap().max, 10);
    }

    #[test]
    fn loads_yaml_policy_document() {
        let yaml = "version: 1\ninput:\n  maxLength: 2000\n  sensitivity: paranoid\n";
        let policy = Policy::from_yaml(yaml).unwrap();
        assert_eq!(policy.input.max_length, 2000);
        assert_eq!(policy.input.scanner.sensitivity, Sensitivity::Paranoid);
    }

    #[test]
    fn rejects_unsupported_version() {
        let json = r#"{"version": 2}"#;
        assert!(Policy::from_json(json).is_err());
    }

    #[test]
    fn rejects_malformed_rate_limit_spec() {
        let json = r#"{"version": 1, "limits": {"read_file": "not-a-limit"}}"#;
        assert!(Policy::from_json(json).is_err());
    }
}
