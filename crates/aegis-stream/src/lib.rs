//! # Stream Monitor - Outbound Token-Stream Scanning
//!
//! The output side of the detection pipeline: a back-pressured transducer
//! that sits between an LLM's raw token stream and whatever consumes it
//! (a chat UI, a downstream tool call), scanning each chunk before letting
//! it through.
//!
//! ## Capabilities
//!
//! 1. **Canary-token leak detection** - exact-match detection of tokens the
//!    caller injected into the original prompt, catching system-prompt
//!    exfiltration even through paraphrase.
//! 2. **PII detection** - eleven built-in kinds plus custom patterns, with
//!    optional in-place redaction instead of termination.
//! 3. **Secret detection** - API-key-shaped tokens and PEM headers, always
//!    critical.
//! 4. **Injection-payload detection** - the same pattern family the input
//!    scanner runs, applied to echoed-back model output.
//! 5. **Markdown sanitization** - stripping of exfiltration-beacon-shaped
//!    image/link URLs.
//!
//! ## Kill Switch
//!
//! On any critical, non-redactable violation, the monitor terminates: its
//! violation callback fires exactly once, and every write after that
//! returns [`error::StreamError::AlreadyTerminated`] without being scanned
//! again. There is no path back from a terminated stream.
//!
//! ## Example
//!
//! ```rust
//! use aegis_stream::{StreamMonitor, StreamMonitorConfig};
//!
//! let mut monitor = StreamMonitor::new(StreamMonitorConfig::default()).unwrap();
//! match monitor.write("The weather today is sunny.") {
//!     Ok(outcome) => print!("{}", outcome.emitted),
//!     Err(e) => eprintln!("stream terminated: {e}"),
//! }
//! ```

pub mod canary;
pub mod error;
pub mod monitor;
pub mod pii;
pub mod secrets;

pub use error::{Result, StreamError};
pub use monitor::{StreamMonitor, StreamMonitorConfig, Violation, WriteOutcome};
pub use pii::CustomPiiPattern;
