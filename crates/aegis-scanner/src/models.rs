//! # Core Types for the Input Scanner
//!
//! This module defines the data types produced and consumed by the input
//! scanning pipeline: the detection taxonomy, severity weighting, composite
//! scan results, and sanitization errors.
//!
//! ## Design Principles
//!
//! 1. **Exhaustive classification** - every detection maps to a specific kind.
//! 2. **Severity-weighted scoring** - each kind carries a severity, not a
//!    free-floating confidence; the composite score is the clamped sum of
//!    severity weights.
//! 3. **Serializable** - all types derive Serde traits for logging and audit
//!    trails.
//!
//! ## References
//!
//! - OWASP LLM Top 10: <https://owasp.org/www-project-top-10-for-large-language-model-applications/>
//! - MITRE ATLAS: <https://atlas.mitre.org/>

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The complete set of detection kinds the scanner and stream monitor emit.
///
/// This taxonomy is shared across the input-side scanner and the output-side
/// stream monitor; not every kind is reachable from every pipeline (e.g.
/// `canary_leak` is stream-monitor only), but a single enum keeps audit
/// entries and reports uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    InstructionOverride,
    RoleManipulation,
    SkeletonKey,
    DelimiterEscape,
    EncodingAttack,
    AdversarialSuffix,
    PerplexityAnomaly,
    ManyShot,
    MultiLanguage,
    Virtualization,
    MarkdownInjection,
    ContextFlooding,
    IndirectInjection,
    ToolAbuse,
    DataExfiltration,
    PrivilegeEscalation,
    MemoryPoisoning,
    ChainInjection,
    HistoryManipulation,
    DenialOfWallet,
    LanguageSwitching,
    ModelFingerprinting,
    ImageInjection,
    AudioInjection,
    DocumentInjection,
    LlmJudgeRejected,
    IntentMisalignment,
    CanaryLeak,
    SecretDetected,
    Custom,
}

impl DetectionKind {
    /// Returns the OWASP LLM Top 10 category this kind maps to, for audit
    /// context and operator-facing reports.
    pub fn owasp_category(&self) -> &'static str {
        use DetectionKind::*;
        match self {
            InstructionOverride | RoleManipulation | SkeletonKey | DelimiterEscape
            | Virtualization | IndirectInjection | ChainInjection | HistoryManipulation
            | Custom => "LLM01: Prompt Injection",
            EncodingAttack | AdversarialSuffix | PerplexityAnomaly | ManyShot | MultiLanguage
            | LanguageSwitching | ContextFlooding => "LLM01: Prompt Injection",
            DataExfiltration | CanaryLeak | SecretDetected | ModelFingerprinting => {
                "LLM06: Sensitive Information Disclosure"
            }
            ToolAbuse | PrivilegeEscalation => "LLM08: Excessive Agency",
            MemoryPoisoning => "LLM04: Data and Model Poisoning",
            DenialOfWallet => "LLM10: Unbounded Consumption",
            MarkdownInjection | ImageInjection | AudioInjection | DocumentInjection => {
                "LLM01: Prompt Injection"
            }
            LlmJudgeRejected | IntentMisalignment => "LLM09: Misinformation",
        }
    }
}

/// Severity of a single detection; drives both scoring weight and whether a
/// detection can terminate a stream outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight contributed to the composite score. Fixed by the scoring model
    /// in the data model, not configurable per instance.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Critical => 0.9,
            Severity::High => 0.6,
            Severity::Medium => 0.3,
            Severity::Low => 0.1,
        }
    }
}

/// Sensitivity preset controlling the `safe` threshold and, for `Permissive`,
/// which severities even count toward it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Paranoid,
    Balanced,
    Permissive,
}

impl Sensitivity {
    /// The score threshold below which content is considered safe.
    pub fn threshold(self) -> f64 {
        match self {
            Sensitivity::Paranoid => 0.2,
            Sensitivity::Balanced => 0.4,
            Sensitivity::Permissive => 0.7,
        }
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Balanced
    }
}

/// A byte-offset span into the normalized text a detection was matched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A single detection raised by any pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub kind: DetectionKind,
    /// Name of the pattern or heuristic that matched, for forensic lookup.
    pub pattern: String,
    /// The exact matched substring.
    pub matched: String,
    pub severity: Severity,
    pub position: Span,
    pub description: String,
}

impl Detection {
    pub fn new(
        kind: DetectionKind,
        pattern: impl Into<String>,
        matched: impl Into<String>,
        severity: Severity,
        position: Span,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            matched: matched.into(),
            severity,
            position,
            description: description.into(),
        }
    }
}

/// Entropy analysis summary for a scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyInfo {
    pub mean: f64,
    pub max_window: f64,
    pub anomalous: bool,
}

/// Character n-gram perplexity summary for a scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerplexityInfo {
    pub mean: f64,
    pub max_window: f64,
    pub anomalous: bool,
}

/// Language/script composition of a scanned text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// Best-guess primary script or language tag (e.g. "latin", "cyrillic").
    pub primary: String,
    /// Indices (character offsets) where the active script changed.
    pub switches: Vec<usize>,
}

/// Composite result of scanning one piece of quarantined text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub safe: bool,
    pub score: f64,
    pub detections: Vec<Detection>,
    pub normalized_text: String,
    pub language: LanguageInfo,
    pub entropy: EntropyInfo,
    pub perplexity: Option<PerplexityInfo>,
    pub judge_verdict: Option<bool>,
}

impl ScanResult {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.detections.iter().map(|d| d.severity).max()
    }

    pub fn has_kind(&self, kind: DetectionKind) -> bool {
        self.detections.iter().any(|d| d.kind == kind)
    }
}

/// Errors that can occur during content sanitization (CDR-style text cleanup).
///
/// Scanning itself never fails on content (see the scanner's failure
/// semantics); these errors are confined to the explicit sanitize helpers
/// that produce a cleaned copy of text or structured data for a caller that
/// wants one, independent of scoring.
#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    #[error("content too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("sanitization failed: {0}")]
    Failed(String),
}

/// Errors surfaced by scanner construction (never by scanning content itself).
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("invalid pattern `{name}`: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}
