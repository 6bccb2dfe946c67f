//! # Exfiltration Fingerprinting
//!
//! Tracks fingerprints of data read by prior tool calls within a session
//! (the full trimmed output, plus every line at least 20 characters long)
//! so the validator can catch a later call to an external-destination tool
//! that tries to smuggle that same data back out.

use std::collections::HashSet;

use crate::policy::glob_match;

const MIN_LINE_FINGERPRINT_LEN: usize = 20;

#[derive(Debug, Default)]
pub struct FingerprintStore {
    fingerprints: HashSet<String>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records fingerprints from one tool's output.
    pub fn record(&mut self, output: &str) {
        let trimmed = output.trim();
        if !trimmed.is_empty() {
            self.fingerprints.insert(trimmed.to_string());
        }
        for line in trimmed.lines() {
            if line.len() >= MIN_LINE_FINGERPRINT_LEN {
                self.fingerprints.insert(line.to_string());
            }
        }
    }

    /// Returns a recorded fingerprint that `value` contains, if any.
    pub fn find_leaked_fingerprint(&self, value: &str) -> Option<&str> {
        self.fingerprints.iter().find(|fp| value.contains(fp.as_str())).map(|s| s.as_str())
    }
}

/// True if `tool` matches one of the configured external-destination
/// patterns (the tools `noExfiltration` applies to).
pub fn is_exfiltration_tool(tool: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| glob_match(p, tool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_full_output_and_long_lines() {
        let mut store = FingerprintStore::new();
        store.record("short\nthis line is long enough to fingerprint");
        assert!(store.find_leaked_fingerprint("this line is long enough to fingerprint and more").is_some());
    }

    #[test]
    fn short_lines_are_not_fingerprinted_individually() {
        let mut store = FingerprintStore::new();
        store.record("short\nalso short");
        assert!(store.find_leaked_fingerprint("short text elsewhere").is_none());
    }

    #[test]
    fn clean_value_has_no_leak() {
        let mut store = FingerprintStore::new();
        store.record("some previously read secret document contents here");
        assert!(store.find_leaked_fingerprint("totally unrelated value").is_none());
    }

    #[test]
    fn exfiltration_tool_matches_default_patterns() {
        let patterns: Vec<String> = crate::policy::DEFAULT_EXFIL_PATTERNS.iter().map(|s| s.to_string()).collect();
        assert!(is_exfiltration_tool("send_email", &patterns));
        assert!(is_exfiltration_tool("webhook_notify", &patterns));
        assert!(!is_exfiltration_tool("read_file", &patterns));
    }
}
