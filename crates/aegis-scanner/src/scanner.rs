//! # Input Scanner
//!
//! The scanner is the facade over the whole input-side detection pipeline:
//! encoding normalization, pattern matching, entropy analysis, perplexity
//! estimation, many-shot detection, context-flooding, and language/script
//! switching. A single [`InputScanner`] instance holds the compiled pattern
//! table (process-wide, read-only after construction) and is safe to share
//! across sessions; callers create one scanner and reuse it for every scan.
//!
//! ## Architecture
//!
//! ```text
//! Quarantine<String> ──▶ normalize ──▶ pattern match ──┬──▶ entropy
//!                                                       ├──▶ perplexity
//!                                                       ├──▶ many-shot
//!                                                       ├──▶ context flooding
//!                                                       └──▶ language/script
//!                                                              │
//!                                                              ▼
//!                                                         ScanResult
//! ```
//!
//! ## References
//!
//! - **Zou et al. (2023)** - "Universal and Transferable Adversarial Attacks on
//!   Aligned Language Models" <https://arxiv.org/abs/2307.15043>
//! - **Greshake et al. (2023)** - "Not What You've Signed Up For"
//!   <https://arxiv.org/abs/2302.12173>

use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::entropy::{self, DEFAULT_ENTROPY_THRESHOLD};
use crate::language;
use crate::many_shot::{self, DEFAULT_MANY_SHOT_THRESHOLD};
use crate::models::{
    Detection, DetectionKind, EntropyInfo, LanguageInfo, PerplexityInfo, ScanResult, ScannerError,
    Sensitivity, Severity, Span,
};
use crate::patterns::{self, Pattern};
use crate::perplexity::{self, DEFAULT_PERPLEXITY_THRESHOLD};
use crate::quarantine::Quarantine;

/// Length, in characters, above which input is flagged for context flooding.
pub const CONTEXT_FLOODING_LIMIT: usize = 10_000;

/// Default sliding-window size (characters) for entropy/perplexity analysis.
const DEFAULT_WINDOW_SIZE: usize = 40;

/// Tunable behavior of the [`InputScanner`]. Mirrors the `input` section of
/// the policy data model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub sensitivity: Sensitivity,
    pub encoding_normalization: bool,
    pub entropy_enabled: bool,
    pub perplexity_enabled: bool,
    pub entropy_threshold: f64,
    pub perplexity_threshold: f64,
    pub many_shot_threshold: usize,
    pub context_flooding_limit: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            sensitivity: Sensitivity::default(),
            encoding_normalization: true,
            entropy_enabled: true,
            perplexity_enabled: true,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            perplexity_threshold: DEFAULT_PERPLEXITY_THRESHOLD,
            many_shot_threshold: DEFAULT_MANY_SHOT_THRESHOLD,
            context_flooding_limit: CONTEXT_FLOODING_LIMIT,
        }
    }
}

/// The input-side detection pipeline. Stateless with respect to its
/// callers: holds only the compiled, immutable pattern table and config.
pub struct InputScanner {
    config: ScannerConfig,
    patterns: Vec<Pattern>,
    custom_patterns: Vec<Pattern>,
}

impl InputScanner {
    /// Builds a scanner with default configuration and no custom patterns.
    pub fn new() -> Result<Self, ScannerError> {
        Self::with_config(ScannerConfig::default())
    }

    pub fn with_config(config: ScannerConfig) -> Result<Self, ScannerError> {
        Ok(Self {
            config,
            patterns: patterns::build_patterns()?,
            custom_patterns: Vec::new(),
        })
    }

    /// Adds a user-supplied pattern, always emitting [`DetectionKind::Custom`]
    /// on match.
    pub fn add_custom_pattern(
        &mut self,
        name: &str,
        regex: &str,
        severity: Severity,
        description: &str,
    ) -> Result<(), ScannerError> {
        self.custom_patterns
            .push(patterns::compile_custom(name, regex, severity, description)?);
        Ok(())
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scans quarantined text end to end, producing a composite [`ScanResult`].
    ///
    /// Consumes the quarantine container: the scanner is the one component
    /// the data model permits to unwrap untrusted text, since scanning it is
    /// precisely the audited act that makes the content trustworthy to act on.
    /// Never mutates or panics on content; malformed input is replaced with
    /// the Unicode replacement character upstream of this call.
    pub fn scan(&self, input: Quarantine<String>) -> ScanResult {
        let original = input.unsafe_unwrap("input scanner consuming quarantined text for scoring");
        self.scan_str(&original)
    }

    /// Scans a plain string. Exposed for components (Stream Monitor, Action
    /// Validator's MCP parameter scan) that re-run the same pipeline on
    /// already-quarantined-and-unwrapped text under their own audit trail.
    pub fn scan_str(&self, original: &str) -> ScanResult {
        let mut detections = Vec::new();

        let normalized = if self.config.encoding_normalization {
            encoding::normalize(original)
        } else {
            original.to_string()
        };

        if self.config.encoding_normalization {
            self.scan_base64_candidates(&normalized, &mut detections);
        }

        self.match_patterns(&normalized, &mut detections);

        let entropy = if self.config.entropy_enabled {
            let info = entropy::analyze(&normalized, DEFAULT_WINDOW_SIZE, self.config.entropy_threshold);
            if info.anomalous {
                detections.push(Detection::new(
                    DetectionKind::AdversarialSuffix,
                    "entropy_window",
                    "",
                    Severity::Medium,
                    Span { start: 0, end: normalized.len() },
                    format!("High entropy window: {:.2} bits/char", info.max_window),
                ));
            }
            info
        } else {
            EntropyInfo { mean: 0.0, max_window: 0.0, anomalous: false }
        };

        let perplexity = if self.config.perplexity_enabled {
            let info = perplexity::analyze(&normalized, DEFAULT_WINDOW_SIZE, self.config.perplexity_threshold);
            if info.anomalous {
                detections.push(Detection::new(
                    DetectionKind::PerplexityAnomaly,
                    "perplexity_window",
                    "",
                    Severity::High,
                    Span { start: 0, end: normalized.len() },
                    format!("High perplexity window: {:.2} bits/char", info.max_window),
                ));
            }
            Some(info)
        } else {
            None
        };

        let qa_pairs = many_shot::count_qa_pairs(&normalized);
        if qa_pairs >= self.config.many_shot_threshold {
            detections.push(Detection::new(
                DetectionKind::ManyShot,
                "qa_pair_count",
                "",
                Severity::High,
                Span { start: 0, end: normalized.len() },
                format!("{qa_pairs} Q/A-shaped pairs detected (threshold {})", self.config.many_shot_threshold),
            ));
        }

        if original.chars().count() > self.config.context_flooding_limit {
            detections.push(Detection::new(
                DetectionKind::ContextFlooding,
                "length_threshold",
                "",
                Severity::Medium,
                Span { start: 0, end: original.len() },
                format!(
                    "Input length {} exceeds context flooding limit {}",
                    original.chars().count(),
                    self.config.context_flooding_limit
                ),
            ));
        }

        // Script classification runs on the *original* text; homoglyph
        // folding would erase the very switches this stage looks for.
        let (switching_anomalous, _switch_count, switch_positions) = language::is_language_switching(original);
        if switching_anomalous {
            detections.push(Detection::new(
                DetectionKind::LanguageSwitching,
                "script_switch_density",
                "",
                Severity::Medium,
                Span { start: 0, end: original.len() },
                "Anomalous density of script switches",
            ));
        }
        let (multi_lang, _langs) = language::is_multi_language(original);
        if multi_lang {
            detections.push(Detection::new(
                DetectionKind::MultiLanguage,
                "multi_language_detection",
                "",
                Severity::Medium,
                Span { start: 0, end: original.len() },
                "Multiple natural languages detected with high confidence",
            ));
        }
        let language = LanguageInfo {
            primary: language::primary_script(original).to_string(),
            switches: switch_positions,
        };

        let score = composite_score(&detections, self.config.sensitivity);
        let safe = score < self.config.sensitivity.threshold();

        ScanResult {
            safe,
            score,
            detections,
            normalized_text: normalized,
            language,
            entropy,
            perplexity,
            judge_verdict: None,
        }
    }

    fn match_patterns(&self, normalized: &str, detections: &mut Vec<Detection>) {
        for pattern in self.patterns.iter().chain(self.custom_patterns.iter()) {
            if let Some(m) = pattern.regex.find(normalized) {
                detections.push(Detection::new(
                    pattern.kind,
                    pattern.name,
                    m.as_str(),
                    pattern.severity,
                    Span { start: m.start(), end: m.end() },
                    pattern.description,
                ));
            }
        }
    }

    fn scan_base64_candidates(&self, normalized: &str, detections: &mut Vec<Detection>) {
        for candidate in encoding::find_base64_candidates(normalized) {
            for pattern in self.patterns.iter().chain(self.custom_patterns.iter()) {
                if let Some(m) = pattern.regex.find(&candidate.decoded) {
                    detections.push(Detection::new(
                        DetectionKind::EncodingAttack,
                        pattern.name,
                        m.as_str(),
                        pattern.severity,
                        Span { start: candidate.start, end: candidate.end },
                        format!("Base64-decoded content matched pattern: {}", pattern.description),
                    ));
                }
            }
        }
    }
}

impl Default for InputScanner {
    fn default() -> Self {
        Self::new().expect("built-in pattern table must compile")
    }
}

/// Sum of severity weights, clamped to 1.0. Permissive sensitivity counts
/// only critical-severity detections.
fn composite_score(detections: &[Detection], sensitivity: Sensitivity) -> f64 {
    let relevant = detections.iter().filter(|d| {
        !matches!(sensitivity, Sensitivity::Permissive) || d.severity == Severity::Critical
    });
    relevant.map(|d| d.severity.weight()).sum::<f64>().min(1.0)
}
