//! # Action Validator
//!
//! The pre-execution gate for proposed tool invocations: policy allow/deny,
//! per-tool rate limiting, denial-of-wallet budgets, parameter-safety
//! checks, a recursive MCP-parameter scan through the Input Scanner, and an
//! exfiltration check against previously-read tool output. Actions flagged
//! for approval suspend on an injectable async callback.
//!
//! ## Pipeline
//!
//! ```text
//! policy → rate limit → denial-of-wallet → parameter safety →
//! MCP parameter scan → exfiltration → approval
//! ```
//!
//! Every stage short-circuits on the first deny. A deny is data
//! (`ActionValidationResult.allowed = false`), never a thrown error -
//! `ValidatorError` is reserved for construction-time misconfiguration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aegis_validator::{ActionValidator, ActionPolicy, ActionRequest, ProposedAction};
//!
//! # async fn example() {
//! let validator = ActionValidator::new(ActionPolicy::balanced()).unwrap();
//! let request = ActionRequest {
//!     original_request: "summarize this file".to_string(),
//!     proposed_action: ProposedAction { tool: "read_file".to_string(), params: Default::default() },
//!     previous_tool_output: None,
//! };
//! let result = validator.check(request).await;
//! assert!(result.allowed);
//! # }
//! ```

pub mod error;
pub mod exfiltration;
pub mod limits;
pub mod params;
pub mod policy;
pub mod validator;

pub use error::{Result, ValidatorError};
pub use policy::ActionPolicy;
pub use validator::{
    ActionRequest, ActionValidationResult, ActionValidator, ApprovalCallback, ApprovalFuture,
    ProposedAction,
};
