//! # Stream Monitor
//!
//! A back-pressured, single-producer/single-consumer pipe over outbound LLM
//! token chunks. Chunks written in are scanned before being emitted out,
//! preserving order: no byte reaches the downstream consumer before the
//! window containing it has been tested. On a critical violation the
//! transducer fires its violation callback exactly once and then refuses
//! every subsequent write - the "kill switch."
//!
//! ## Window Management
//!
//! The monitor holds a bounded trailing window of previously-emitted text.
//! Each write is scanned as `window + chunk`, so patterns straddling a
//! chunk boundary are still caught; the window is then trimmed back to
//! `window_size` characters. The default window size (1024 characters) is
//! sized at roughly 4x the longest built-in pattern, with headroom for the
//! longest PII/secret patterns, per the overlap-scanning policy this
//! component follows.
//!
//! ## Scan Triggers
//!
//! - Canary-token leak: exact substring match, always critical, always
//!   terminates.
//! - Secret-shaped tokens (API keys, PEM headers): always critical, always
//!   terminates.
//! - Critical-severity injection-payload patterns (the same family the
//!   input scanner runs, applied to echoed-back output): terminates.
//! - PII: redacted in place when `pii_redaction` is enabled, otherwise
//!   terminates.
//! - Markdown exfiltration beacons (oversized query strings, `data:` URLs):
//!   stripped in place when `sanitize_markdown` is enabled.
//! - Custom user patterns: registered via [`StreamMonitor::add_custom_pattern`]
//!   (checked alongside the built-in injection family) and
//!   [`StreamMonitor::add_custom_pii_pattern`] (checked alongside the
//!   built-in PII kinds, subject to the same redaction policy).

use std::sync::Arc;

use aegis_scanner::models::{Detection, DetectionKind, Severity, Span};
use aegis_scanner::patterns::{self, Pattern};

use crate::canary;
use crate::error::{Result, StreamError};
use crate::pii::{self, CustomPiiPattern};
use crate::secrets;

/// Default trailing window size, in characters.
pub const DEFAULT_WINDOW_SIZE: usize = 1024;

/// Configuration for a [`StreamMonitor`].
#[derive(Debug, Clone)]
pub struct StreamMonitorConfig {
    pub window_size: usize,
    pub canaries: Vec<String>,
    pub detect_pii: bool,
    pub pii_redaction: bool,
    pub detect_secrets: bool,
    pub detect_injection_payloads: bool,
    pub sanitize_markdown: bool,
}

impl Default for StreamMonitorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            canaries: Vec::new(),
            detect_pii: true,
            pii_redaction: true,
            detect_secrets: true,
            detect_injection_payloads: true,
            sanitize_markdown: true,
        }
    }
}

/// A critical finding that terminated the stream.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    pub kind: DetectionKind,
    pub matched: String,
    pub position: usize,
    pub description: String,
}

/// Non-terminating result of a single write: the (possibly redacted) text
/// safe to emit downstream, plus any non-critical detections raised along
/// the way.
pub struct WriteOutcome {
    pub emitted: String,
    pub detections: Vec<Detection>,
}

type ViolationCallback = Arc<dyn Fn(&Violation) + Send + Sync>;

/// Regex for markdown image/link syntax carrying a `data:` URL or an
/// oversized query string (an exfiltration-beacon shape).
fn markdown_exfil_pattern() -> regex::Regex {
    regex::Regex::new(r"!?\[[^\]]*\]\((data:[^)]+|https?://[^\s)]+\?[^\s)]{40,})\)").unwrap()
}

pub struct StreamMonitor {
    config: StreamMonitorConfig,
    injection_patterns: Vec<Pattern>,
    custom_patterns: Vec<Pattern>,
    custom_pii_patterns: Vec<CustomPiiPattern>,
    window: String,
    terminated: bool,
    on_violation: Option<ViolationCallback>,
}

impl StreamMonitor {
    pub fn new(config: StreamMonitorConfig) -> Result<Self> {
        let injection_patterns = if config.detect_injection_payloads {
            patterns::build_patterns().map_err(|e| match e {
                aegis_scanner::models::ScannerError::InvalidPattern { name, source } => {
                    StreamError::InvalidPattern { name, source }
                }
            })?
        } else {
            Vec::new()
        };
        Ok(Self {
            config,
            injection_patterns,
            custom_patterns: Vec::new(),
            custom_pii_patterns: Vec::new(),
            window: String::new(),
            terminated: false,
            on_violation: None,
        })
    }

    /// Registers a custom regex pattern, checked alongside the built-in
    /// injection-payload family on every write (critical-severity custom
    /// patterns terminate the stream; others are reported as detections).
    pub fn add_custom_pattern(
        &mut self,
        name: &str,
        regex: &str,
        severity: Severity,
        description: &str,
    ) -> Result<()> {
        let pattern = patterns::compile_custom(name, regex, severity, description).map_err(|e| {
            match e {
                aegis_scanner::models::ScannerError::InvalidPattern { name, source } => {
                    StreamError::InvalidPattern { name, source }
                }
            }
        })?;
        self.custom_patterns.push(pattern);
        Ok(())
    }

    /// Registers a custom PII regex, checked alongside the built-in PII
    /// kinds. Subject to the same `pii_redaction` policy as built-ins: in
    /// place redaction when enabled, stream termination otherwise.
    pub fn add_custom_pii_pattern(&mut self, label: &str, regex: &str) -> Result<()> {
        let pattern = CustomPiiPattern::new(label, regex).map_err(|source| StreamError::InvalidPattern {
            name: label.to_string(),
            source,
        })?;
        self.custom_pii_patterns.push(pattern);
        Ok(())
    }

    /// Registers the violation callback; invoked exactly once, on the write
    /// that triggers termination.
    pub fn set_on_violation(&mut self, cb: impl Fn(&Violation) + Send + Sync + 'static) {
        self.on_violation = Some(Arc::new(cb));
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    fn terminate(&mut self, violation: Violation) -> StreamError {
        self.terminated = true;
        tracing::warn!(kind = ?violation.kind, matched = %violation.matched, "stream monitor kill switch fired");
        if let Some(cb) = &self.on_violation {
            cb(&violation);
        }
        StreamError::Violation {
            matched: violation.matched,
            position: violation.position,
            description: violation.description,
        }
    }

    /// Scans and emits one chunk. Returns `Err` exactly once, on the write
    /// that trips the kill switch; every write after that also errors
    /// without re-scanning, satisfying the "no further output" guarantee.
    pub fn write(&mut self, chunk: &str) -> Result<WriteOutcome> {
        if self.terminated {
            return Err(StreamError::AlreadyTerminated {
                reason: "a prior write already triggered a stream violation".to_string(),
            });
        }

        let combined = format!("{}{}", self.window, chunk);

        for canary_token in &self.config.canaries {
            if let Some(pos) = combined.find(canary_token.as_str()) {
                let violation = Violation {
                    kind: DetectionKind::CanaryLeak,
                    matched: canary_token.clone(),
                    position: pos,
                    description: "canary token detected in output stream".to_string(),
                };
                return Err(self.terminate(violation));
            }
        }

        if self.config.detect_secrets {
            if let Some(m) = secrets::find_secrets(&combined).into_iter().next() {
                let violation = Violation {
                    kind: DetectionKind::SecretDetected,
                    matched: m.matched,
                    position: m.start,
                    description: "secret-shaped token detected in output stream".to_string(),
                };
                return Err(self.terminate(violation));
            }
        }

        for pattern in self.injection_patterns.iter().chain(self.custom_patterns.iter()) {
            if pattern.severity == Severity::Critical {
                if let Some(m) = pattern.regex.find(&combined) {
                    let violation = Violation {
                        kind: pattern.kind,
                        matched: m.as_str().to_string(),
                        position: m.start(),
                        description: pattern.description.to_string(),
                    };
                    return Err(self.terminate(violation));
                }
            }
        }

        let mut detections = Vec::new();
        let mut working = chunk.to_string();

        if self.config.detect_pii {
            let pii_matches = pii::find_pii_with_custom(chunk, &self.custom_pii_patterns);
            if !pii_matches.is_empty() {
                if !self.config.pii_redaction {
                    let m = &pii_matches[0];
                    let violation = Violation {
                        kind: DetectionKind::DataExfiltration,
                        matched: m.matched.clone(),
                        position: m.start,
                        description: format!("PII ({}) detected with redaction disabled", m.label),
                    };
                    return Err(self.terminate(violation));
                }
                working = redact_pii(chunk, &pii_matches);
                for m in &pii_matches {
                    detections.push(Detection::new(
                        DetectionKind::DataExfiltration,
                        format!("pii_{}", m.label),
                        m.matched.clone(),
                        Severity::Medium,
                        Span { start: m.start, end: m.end },
                        "PII redacted in outbound stream",
                    ));
                }
            }
        }

        for pattern in self.injection_patterns.iter().chain(self.custom_patterns.iter()) {
            if pattern.severity != Severity::Critical {
                if let Some(m) = pattern.regex.find(&working) {
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

        if self.config.sanitize_markdown {
            let beacon = markdown_exfil_pattern();
            if let Some(m) = beacon.find(&working.clone()) {
                detections.push(Detection::new(
                    DetectionKind::MarkdownInjection,
                    "markdown_exfil_beacon",
                    m.as_str(),
                    Severity::High,
                    Span { start: m.start(), end: m.end() },
                    "markdown link/image with exfiltration-beacon-shaped URL stripped",
                ));
                working = beacon.replace_all(&working, "[LINK REMOVED]").to_string();
            }
        }

        self.window.push_str(chunk);
        if self.window.chars().count() > self.config.window_size {
            let trimmed: String = self
                .window
                .chars()
                .skip(self.window.chars().count() - self.config.window_size)
                .collect();
            self.window = trimmed;
        }

        Ok(WriteOutcome { emitted: working, detections })
    }
}

fn redact_pii(chunk: &str, matches: &[pii::PiiMatch]) -> String {
    let mut out = String::with_capacity(chunk.len());
    let mut last = 0usize;
    let mut sorted: Vec<&pii::PiiMatch> = matches.iter().collect();
    sorted.sort_by_key(|m| m.start);
    for m in sorted {
        if m.start < last {
            continue;
        }
        out.push_str(&chunk[last..m.start]);
        out.push_str(&format!("[REDACTED:{}]", m.label));
        last = m.end;
    }
    out.push_str(&chunk[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_chunks_pass_through_unmodified() {
        let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
        let outcome = monitor.write("Here is your answer.").unwrap();
        assert_eq!(outcome.emitted, "Here is your answer.");
        assert!(!monitor.is_terminated());
    }

    #[test]
    fn canary_leak_terminates_stream() {
        let canary_token = canary::generate_canary();
        let config = StreamMonitorConfig {
            canaries: vec![canary_token.clone()],
            ..StreamMonitorConfig::default()
        };
        let mut monitor = StreamMonitor::new(config).unwrap();
        monitor.write("AAAAA").unwrap();
        let result = monitor.write(&format!("leaked: {canary_token}"));
        assert!(result.is_err());
        assert!(monitor.is_terminated());
    }

    #[test]
    fn no_further_output_after_termination() {
        let canary_token = canary::generate_canary();
        let config = StreamMonitorConfig {
            canaries: vec![canary_token.clone()],
            ..StreamMonitorConfig::default()
        };
        let mut monitor = StreamMonitor::new(config).unwrap();
        let _ = monitor.write(&canary_token);
        assert!(monitor.write("anything at all").is_err());
    }

    #[test]
    fn pii_redacted_when_enabled() {
        let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
        let outcome = monitor.write("my ssn is 123-45-6789").unwrap();
        assert!(!outcome.emitted.contains("123-45-6789"));
        assert!(outcome.emitted.contains("[REDACTED:ssn]"));
        assert!(!monitor.is_terminated());
    }

    #[test]
    fn pii_terminates_when_redaction_disabled() {
        let config = StreamMonitorConfig { pii_redaction: false, ..StreamMonitorConfig::default() };
        let mut monitor = StreamMonitor::new(config).unwrap();
        let result = monitor.write("my ssn is 123-45-6789");
        assert!(result.is_err());
        assert!(monitor.is_terminated());
    }

    #[test]
    fn secret_detected_terminates_stream() {
        let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
        let result = monitor.write("here is the key: sk-abcdefghijklmnopqrstuvwxyz123456");
        assert!(result.is_err());
        assert!(monitor.is_terminated());
    }

    #[test]
    fn overlap_scanning_catches_cross_chunk_canary() {
        let canary_token = canary::generate_canary();
        let config = StreamMonitorConfig {
            canaries: vec![canary_token.clone()],
            ..StreamMonitorConfig::default()
        };
        let mut monitor = StreamMonitor::new(config).unwrap();
        let midpoint = canary_token.len() / 2;
        let (first_half, second_half) = canary_token.split_at(midpoint);
        monitor.write(first_half).unwrap();
        let result = monitor.write(second_half);
        assert!(result.is_err());
    }

    #[test]
    fn violation_callback_fires_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let canary_token = canary::generate_canary();
        let config = StreamMonitorConfig {
            canaries: vec![canary_token.clone()],
            ..StreamMonitorConfig::default()
        };
        let mut monitor = StreamMonitor::new(config).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        monitor.set_on_violation(move |_v| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let _ = monitor.write(&canary_token);
        let _ = monitor.write("more text");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn custom_pattern_terminates_at_critical_severity() {
        let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
        monitor.add_custom_pattern("house_codeword", r"the eagle has landed", Severity::Critical, "internal codeword leaked").unwrap();
        let result = monitor.write("status update: the eagle has landed safely");
        assert!(result.is_err());
        assert!(monitor.is_terminated());
    }

    #[test]
    fn custom_pattern_below_critical_is_reported_not_terminated() {
        let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
        monitor.add_custom_pattern("internal_project_name", r"Project Nightshade", Severity::Medium, "internal project codename mentioned").unwrap();
        let outcome = monitor.write("the plan, codenamed Project Nightshade, ships next quarter").unwrap();
        assert!(!monitor.is_terminated());
        assert!(outcome.detections.iter().any(|d| d.matched == "Project Nightshade"));
    }

    #[test]
    fn custom_pii_pattern_is_redacted_in_place() {
        let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
        monitor.add_custom_pii_pattern("employee_id", r"\bEMP-\d{5}\b").unwrap();
        let outcome = monitor.write("badge for EMP-40219 was scanned").unwrap();
        assert!(!outcome.emitted.contains("EMP-40219"));
        assert!(outcome.emitted.contains("[REDACTED:employee_id]"));
        assert!(!monitor.is_terminated());
    }

    #[test]
    fn custom_pii_pattern_terminates_when_redaction_disabled() {
        let config = StreamMonitorConfig { pii_redaction: false, ..StreamMonitorConfig::default() };
        let mut monitor = StreamMonitor::new(config).unwrap();
        monitor.add_custom_pii_pattern("employee_id", r"\bEMP-\d{5}\b").unwrap();
        let result = monitor.write("badge for EMP-40219 was scanned");
        assert!(result.is_err());
        assert!(monitor.is_terminated());
    }
}
