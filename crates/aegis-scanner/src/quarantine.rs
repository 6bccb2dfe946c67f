//! # Quarantine - the taint type
//!
//! `Quarantine<T>` marks a value as untrusted so it cannot reach a trusted
//! sink without an explicit, audited unwrap. It is the type-level enforcement
//! behind the scanner's contract: `scan` only accepts quarantined text.
//!
//! # Security Notes
//!
//! - No `Deref`, `AsRef<T>`, `Display`, or `From`/`Into<T>` impl is provided;
//!   the only way out is [`Quarantine::unsafe_unwrap`], which requires a
//!   non-empty reason and increments a process-wide counter.
//! - `Debug` is implemented by hand and never prints the payload, only the
//!   metadata, so a stray `{:?}` in a log line cannot exfiltrate content.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// How much a piece of content is trusted, inferred from its [`Source`]
/// unless the caller overrides it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Where a quarantined value originated. Determines the default [`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    UserInput,
    WebContent,
    Email,
    FileUpload,
    Unknown,
    ApiResponse,
    ToolOutput,
    McpToolOutput,
    ModelOutput,
    Database,
    RagRetrieval,
}

impl Source {
    fn default_risk(self) -> RiskLevel {
        match self {
            Source::UserInput
            | Source::WebContent
            | Source::Email
            | Source::FileUpload
            | Source::Unknown => RiskLevel::High,
            Source::ApiResponse
            | Source::ToolOutput
            | Source::McpToolOutput
            | Source::ModelOutput => RiskLevel::Medium,
            Source::Database | Source::RagRetrieval => RiskLevel::Low,
        }
    }
}

/// Immutable metadata attached to a [`Quarantine`] at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineMetadata {
    pub source: Source,
    pub risk: RiskLevel,
    pub timestamp: u64,
    pub id: Uuid,
}

/// Options controlling how a value is quarantined.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuarantineOptions {
    pub risk_override: Option<RiskLevel>,
}

/// Process-wide count of `unsafe_unwrap` calls. Above
/// [`EXCESSIVE_UNWRAP_THRESHOLD`] an `excessive_unwrap` hook fires.
static UNWRAP_COUNT: AtomicU64 = AtomicU64::new(0);

/// Default threshold above which repeated unwrapping is itself suspicious
/// (a component bypassing quarantine in a loop).
pub const EXCESSIVE_UNWRAP_THRESHOLD: u64 = 10;

/// Returns the current process-wide unwrap count.
pub fn unwrap_count() -> u64 {
    UNWRAP_COUNT.load(Ordering::Relaxed)
}

/// A value of type `T` wrapped with untrusted-provenance metadata.
///
/// The payload is never exposed except through [`Quarantine::unsafe_unwrap`].
pub struct Quarantine<T> {
    payload: T,
    metadata: QuarantineMetadata,
}

impl<T> Quarantine<T> {
    /// Wraps `payload`, inferring risk from `source` unless overridden.
    pub fn new(payload: T, source: Source, options: QuarantineOptions) -> Self {
        let risk = options.risk_override.unwrap_or_else(|| source.default_risk());
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            payload,
            metadata: QuarantineMetadata {
                source,
                risk,
                timestamp,
                id: Uuid::new_v4(),
            },
        }
    }

    /// Metadata is frozen at construction; every read returns the same value.
    pub fn metadata(&self) -> &QuarantineMetadata {
        &self.metadata
    }

    /// Runs `f` against a borrow of the payload without ever moving it out.
    /// The scanner uses this to read text without ever taking ownership.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.payload)
    }

    /// The only escape hatch. `reason` must be non-empty and is recorded for
    /// audit; the process-wide unwrap counter is incremented unconditionally.
    ///
    /// # Panics
    ///
    /// Panics if `reason` is empty - an undocumented unwrap is a programming
    /// error, not a runtime condition to recover from.
    pub fn unsafe_unwrap(self, reason: &str) -> T {
        assert!(!reason.is_empty(), "unsafe_unwrap requires a non-empty reason");
        let count = UNWRAP_COUNT.fetch_add(1, Ordering::Relaxed) + 1;
        if count > EXCESSIVE_UNWRAP_THRESHOLD {
            tracing::warn!(
                unwrap_count = count,
                threshold = EXCESSIVE_UNWRAP_THRESHOLD,
                reason,
                "excessive_unwrap: quarantine unwrap count exceeds threshold"
            );
        }
        tracing::debug!(reason, id = %self.metadata.id, "quarantine unwrapped");
        self.payload
    }
}

impl<T> std::fmt::Debug for Quarantine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quarantine")
            .field("metadata", &self.metadata)
            .field("payload", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarantine_is_quarantined_on_construction() {
        let q = Quarantine::new("hello".to_string(), Source::UserInput, QuarantineOptions::default());
        assert_eq!(q.metadata().source, Source::UserInput);
    }

    #[test]
    fn metadata_is_frozen_across_reads() {
        let q = Quarantine::new("hello".to_string(), Source::Database, QuarantineOptions::default());
        let a = q.metadata().clone();
        let b = q.metadata().clone();
        assert_eq!(a.id, b.id);
        assert_eq!(a.timestamp, b.timestamp);
    }

    #[test]
    fn risk_inferred_from_source() {
        let high = Quarantine::new(1, Source::UserInput, QuarantineOptions::default());
        assert_eq!(high.metadata().risk, RiskLevel::High);
        let medium = Quarantine::new(1, Source::ToolOutput, QuarantineOptions::default());
        assert_eq!(medium.metadata().risk, RiskLevel::Medium);
        let low = Quarantine::new(1, Source::RagRetrieval, QuarantineOptions::default());
        assert_eq!(low.metadata().risk, RiskLevel::Low);
    }

    #[test]
    fn risk_override_wins_over_source() {
        let q = Quarantine::new(
            1,
            Source::Database,
            QuarantineOptions {
                risk_override: Some(RiskLevel::High),
            },
        );
        assert_eq!(q.metadata().risk, RiskLevel::High);
    }

    #[test]
    fn unsafe_unwrap_requires_non_empty_reason() {
        let q = Quarantine::new(42, Source::Unknown, QuarantineOptions::default());
        let result = std::panic::catch_unwind(|| q.unsafe_unwrap(""));
        assert!(result.is_err());
    }

    #[test]
    fn unsafe_unwrap_returns_payload_and_counts() {
        let before = unwrap_count();
        let q = Quarantine::new(42, Source::Unknown, QuarantineOptions::default());
        let value = q.unsafe_unwrap("test consumption");
        assert_eq!(value, 42);
        assert_eq!(unwrap_count(), before + 1);
    }

    #[test]
    fn debug_never_prints_payload() {
        let q = Quarantine::new("super-secret".to_string(), Source::UserInput, QuarantineOptions::default());
        let printed = format!("{:?}", q);
        assert!(!printed.contains("super-secret"));
    }
}
