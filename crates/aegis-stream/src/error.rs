//! Error types for the stream monitor.

use thiserror::Error;

/// Result type alias for stream monitor operations.
pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    /// A write was attempted after the transducer already terminated.
    #[error("stream already terminated: {reason}")]
    AlreadyTerminated { reason: String },

    /// A critical violation fired; the stream is terminated as of this write.
    #[error("stream violation: {description}")]
    Violation {
        matched: String,
        position: usize,
        description: String,
    },

    /// A custom pattern failed to compile at monitor construction.
    #[error("invalid pattern `{name}`: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}
