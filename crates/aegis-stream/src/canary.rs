//! # Canary Token Leak Detection
//!
//! Canary tokens are unique, unforgeable markers injected into a system
//! prompt so the stream monitor can recognize when a model output is
//! quoting back context it should never echo verbatim - a strong signal of
//! system-prompt extraction or indirect-injection-driven exfiltration.
//!
//! ## Design Principles
//!
//! 1. **Uniqueness** - each session generates its own UUID-based token.
//! 2. **Unforgeable** - UUIDv4 provides 122 bits of randomness.
//! 3. **Detectable format** - a fixed prefix makes partial/obfuscated leaks
//!    catchable, not just exact matches.
//! 4. **Session-bound** - a new token per session prevents replay across
//!    sessions.
//!
//! Canary tokens are a detection mechanism, not prevention: they catch
//! leaks after they occur so the stream monitor can kill the response.

use uuid::Uuid;

const CANARY_PREFIX: &str = "CANARY";
const INJECTION_FORMAT: &str = "[SYSTEM_CANARY:{}]";

/// Generates a new unique canary token in the form
/// `CANARY-xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub fn generate_canary() -> String {
    let id = Uuid::new_v4();
    format!("{}-{}", CANARY_PREFIX, id.as_hyphenated())
}

/// Wraps `prompt` with `canary` in a system-directive-like marker so the
/// token rides along in the model's context.
pub fn inject_canary(prompt: &str, canary: &str) -> String {
    format!("{}\n{}", INJECTION_FORMAT.replace("{}", canary), prompt)
}

/// Exact substring match for `canary` in `output`.
pub fn detect_leak(output: &str, canary: &str) -> bool {
    output.contains(canary)
}

/// Looser check for the canary prefix or injection wrapper, to catch
/// partial leaks the exact match misses.
pub fn detect_canary_pattern(output: &str) -> bool {
    output.contains(CANARY_PREFIX) || output.contains("SYSTEM_CANARY")
}

/// Case-insensitive variant of [`detect_canary_pattern`], for models that
/// transform case when echoing leaked content.
pub fn detect_canary_pattern_case_insensitive(output: &str) -> bool {
    let lower = output.to_lowercase();
    lower.contains("canary") || lower.contains("system_canary")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_canary_is_unique_and_prefixed() {
        let c1 = generate_canary();
        let c2 = generate_canary();
        assert_ne!(c1, c2);
        assert!(c1.starts_with(CANARY_PREFIX));
    }

    #[test]
    fn generate_canary_format() {
        let canary = generate_canary();
        assert!(canary.starts_with("CANARY-"));
        let uuid_part = &canary[7..];
        assert_eq!(uuid_part.matches('-').count(), 4);
    }

    #[test]
    fn inject_canary_preserves_prompt() {
        let prompt = "You are a helpful AI assistant.\nBe concise.";
        let canary = generate_canary();
        let injected = inject_canary(prompt, &canary);
        assert!(injected.contains(&canary));
        assert!(injected.ends_with(prompt));
        assert!(injected.starts_with("[SYSTEM_CANARY:"));
    }

    #[test]
    fn detect_leak_exact_match_only() {
        let canary = generate_canary();
        let leaked = format!("The system prompt contains {} which is secret", canary);
        assert!(detect_leak(&leaked, &canary));

        let partial = &canary[..20];
        assert!(!detect_leak(partial, &canary));

        assert!(!detect_leak("This is a normal response.", &canary));
    }

    #[test]
    fn detect_canary_pattern_catches_partial_leaks() {
        assert!(detect_canary_pattern("The CANARY-123 was leaked"));
        assert!(detect_canary_pattern("Found SYSTEM_CANARY in output"));
        assert!(!detect_canary_pattern("This is clean output"));
    }

    #[test]
    fn detect_canary_pattern_case_insensitive_catches_case_variation() {
        assert!(detect_canary_pattern_case_insensitive("the canary was found"));
        assert!(detect_canary_pattern_case_insensitive("CANARY detected"));
        assert!(!detect_canary_pattern_case_insensitive("Clean output"));
    }
}
