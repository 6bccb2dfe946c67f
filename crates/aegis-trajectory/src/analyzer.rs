//! # Trajectory Analyzer
//!
//! Stateless per-call analysis of a multi-turn conversation: keyword drift
//! between consecutive user messages, and escalation-vocabulary scanning.
//! [`analyze_with_risk`] additionally reuses the Input Scanner to build a
//! per-message risk vector, implementing the Input Scanner's own
//! trajectory-mode contract on top of this crate's escalation check.

use aegis_scanner::scanner::InputScanner;
use serde::{Deserialize, Serialize};

use crate::escalation::detect_escalation;
use crate::keywords::{escalation_hits, extract_keywords};
use crate::similarity::{compute_drift, DEFAULT_DRIFT_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Result of [`TrajectoryAnalyzer::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryResult {
    pub similarities: Vec<f64>,
    pub drift_indices: Vec<usize>,
    pub escalation_detected: bool,
    pub escalation_keywords: Vec<String>,
}

/// Multi-turn drift and escalation detector. Stateless aside from its
/// configured drift threshold - every call re-derives its result from the
/// message history passed in.
pub struct TrajectoryAnalyzer {
    drift_threshold: f64,
}

impl Default for TrajectoryAnalyzer {
    fn default() -> Self {
        Self { drift_threshold: DEFAULT_DRIFT_THRESHOLD }
    }
}

impl TrajectoryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drift_threshold(drift_threshold: f64) -> Self {
        Self { drift_threshold }
    }

    /// Keyword drift plus escalation-vocabulary scanning over the
    /// user-role messages in `messages`.
    pub fn analyze(&self, messages: &[Message]) -> TrajectoryResult {
        let user_messages: Vec<&Message> = messages.iter().filter(|m| m.role == Role::User).collect();
        let keyword_sets: Vec<_> = user_messages.iter().map(|m| extract_keywords(&m.content)).collect();
        let (similarities, drift_indices) = compute_drift(&keyword_sets, self.drift_threshold);

        let hits_per_message: Vec<Vec<String>> =
            user_messages.iter().map(|m| escalation_hits(&m.content)).collect();
        let escalation_detected = detect_escalation(&hits_per_message);

        let mut escalation_keywords: Vec<String> = Vec::new();
        for hits in &hits_per_message {
            for hit in hits {
                if !escalation_keywords.contains(hit) {
                    escalation_keywords.push(hit.clone());
                }
            }
        }

        TrajectoryResult { similarities, drift_indices, escalation_detected, escalation_keywords }
    }
}

/// Per-message risk vector produced by [`analyze_with_risk`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTrajectoryResult {
    pub risk_scores: Vec<f64>,
    pub escalation_detected: bool,
}

/// The Input Scanner's trajectory mode: each user message is scanned
/// independently with `scanner`, producing a per-message risk vector.
/// Escalation fires if that risk series is non-decreasing across the final
/// three messages, or if the vocabulary-based escalation check fires.
pub fn analyze_with_risk(messages: &[Message], scanner: &InputScanner) -> ScoredTrajectoryResult {
    let user_messages: Vec<&Message> = messages.iter().filter(|m| m.role == Role::User).collect();

    let risk_scores: Vec<f64> = user_messages.iter().map(|m| scanner.scan_str(&m.content).score).collect();

    let risk_non_decreasing = if risk_scores.len() >= 3 {
        let tail = &risk_scores[risk_scores.len() - 3..];
        tail[0] <= tail[1] && tail[1] <= tail[2]
    } else {
        false
    };

    let hits_per_message: Vec<Vec<String>> =
        user_messages.iter().map(|m| escalation_hits(&m.content)).collect();
    let vocabulary_escalation = detect_escalation(&hits_per_message);

    ScoredTrajectoryResult { risk_scores, escalation_detected: risk_non_decreasing || vocabulary_escalation }
}
