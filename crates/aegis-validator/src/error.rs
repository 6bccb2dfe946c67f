//! Error types for the Action Validator.
//!
//! Deny outcomes are returned as data (`ActionValidationResult.allowed =
//! false`), never thrown; `ValidatorError` is reserved for construction-time
//! configuration mistakes (a malformed rate-limit spec, a pattern that
//! fails to compile).

use thiserror::Error;

/// Result type for validator construction.
pub type Result<T> = std::result::Result<T, ValidatorError>;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("invalid rate limit spec `{0}`: expected `<integer><s|m|h|d>`")]
    InvalidRateLimitSpec(String),

    #[error("invalid policy pattern `{pattern}`: {reason}")]
    InvalidPolicyPattern { pattern: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rate_limit_spec_displays_spec() {
        let err = ValidatorError::InvalidRateLimitSpec("5x".to_string());
        assert!(err.to_string().contains("5x"));
    }
}
