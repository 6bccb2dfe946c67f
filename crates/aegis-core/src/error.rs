//! Error types for the Aegis facade.
//!
//! The Scanner and Validator are local - they return results, never throw
//! for content reasons. `AegisError` only covers what the orchestrator
//! itself decides to throw (a block under a non-`continue` recovery mode,
//! a session already quarantined or terminated) plus construction-time and
//! configuration failures from the component crates.

use thiserror::Error;

use aegis_scanner::{ScanResult, ScannerError};
use aegis_stream::StreamError;
use aegis_validator::ValidatorError;

pub type Result<T> = std::result::Result<T, AegisError>;

#[derive(Debug, Error)]
pub enum AegisError {
    /// A scan scored at or above the sensitivity threshold and the active
    /// recovery mode is not `continue`.
    #[error("input blocked: score {:.2} >= threshold", scan_result.score)]
    InputBlocked { scan_result: Box<ScanResult> },

    /// The session is quarantined (`quarantine-session` recovery mode
    /// tripped on an earlier call) and refuses all further input.
    #[error("session `{0}` is quarantined")]
    SessionQuarantined(String),

    /// The session is terminated (`terminate-session` recovery mode
    /// tripped, or an explicit kill-switch) and refuses all further calls.
    /// Carries the scan result that tripped termination, when there was one
    /// (a call on an already-terminated session has none).
    #[error("session `{session_id}` is terminated")]
    SessionTerminated { session_id: String, scan_result: Option<Box<ScanResult>> },

    #[error("scanner error: {0}")]
    Scanner(#[from] ScannerError),

    #[error("validator error: {0}")]
    Validator(#[from] ValidatorError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
