//! # Input Scanner - Deterministic Prompt-Injection Detection
//!
//! This crate implements the input side of the detection pipeline: a
//! multi-stage, deterministic scanner over quarantined text, plus the
//! [`Quarantine`] taint type that enforces untrusted text cannot reach a
//! trusted sink without an explicit, audited unwrap.
//!
//! ## Capabilities
//!
//! 1. **Quarantine taint type** - a newtype wrapper with no passthrough
//!    conversion out; the only escape is [`quarantine::Quarantine::unsafe_unwrap`].
//! 2. **Input scanning** - encoding normalization, pattern matching, entropy
//!    and perplexity analysis, many-shot detection, context-flooding, and
//!    language/script switching, composed into a single composite score.
//! 3. **Content Disarm & Reconstruct (CDR)** - sanitization of text and
//!    structured data by stripping dangerous elements rather than detecting
//!    them.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Direct injection | "Ignore previous instructions" attacks | Pattern matching |
//! | Indirect injection | Malicious content in retrieved documents | CDR + pattern matching |
//! | GCG attacks | Adversarial suffixes (Zou et al., 2023) | Entropy filtering |
//! | Gibberish substitution | Low-frequency token sequences | Perplexity filtering |
//! | Jailbreaks | DAN, role-play, mode-switching | Pattern matching |
//! | Many-shot jailbreaks | Fabricated Q/A conditioning | Pair-count heuristic |
//! | Homoglyph/encoding smuggling | Unicode/base64 obfuscation | Normalization pipeline |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         INPUT SCANNER                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  Quarantine<String>                                              │
//! │         │                                                        │
//! │         ▼                                                        │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────────┐  │
//! │  │ ENCODING   │─▶│  PATTERN   │─▶│  ENTROPY   │─▶│ PERPLEXITY │  │
//! │  │ NORMALIZE  │  │  LIBRARY   │  │  ANALYSIS  │  │ ESTIMATION │  │
//! │  └────────────┘  └────────────┘  └────────────┘  └────────────┘  │
//! │         │                                               │        │
//! │         ▼                                               ▼        │
//! │  ┌────────────┐  ┌────────────┐  ┌──────────────────────────┐    │
//! │  │ MANY-SHOT  │  │  CONTEXT   │  │   LANGUAGE/SCRIPT         │    │
//! │  │ DETECTION  │  │  FLOODING  │  │   SWITCHING               │    │
//! │  └────────────┘  └────────────┘  └──────────────────────────┘    │
//! │         │                │                    │                  │
//! │         └────────────────┴────────────────────┘                  │
//! │                          ▼                                       │
//! │                    ScanResult                                    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                         CDR ENGINE                                │
//! │  ┌──────────┐ ┌──────────────────┐                               │
//! │  │   TEXT   │ │   STRUCTURED      │                              │
//! │  │ Sanitizer│ │   DATA (JSON)     │                              │
//! │  └──────────┘ └──────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## References
//!
//! - **Zou et al. (2023)** - "Universal and Transferable Adversarial Attacks on
//!   Aligned Language Models" <https://arxiv.org/abs/2307.15043>
//! - **Greshake et al. (2023)** - "Not What You've Signed Up For: Compromising
//!   Real-World LLM-Integrated Applications with Indirect Prompt Injection"
//!   <https://arxiv.org/abs/2302.12173>
//! - **Perez & Ribeiro (2022)** - "Ignore This Title and HackAPrompt"
//!   <https://arxiv.org/abs/2311.16119>
//! - **Jain et al. (2023)** - "Baseline Defenses for Adversarial Attacks"
//!   <https://arxiv.org/abs/2309.00614>
//! - OWASP LLM Top 10: <https://owasp.org/www-project-top-10-for-large-language-model-applications/>
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aegis_scanner::scanner::InputScanner;
//! use aegis_scanner::quarantine::{Quarantine, QuarantineOptions, Source};
//!
//! let scanner = InputScanner::new().unwrap();
//! let input = Quarantine::new(
//!     "Can you help me with my code?".to_string(),
//!     Source::UserInput,
//!     QuarantineOptions::default(),
//! );
//! let result = scanner.scan(input);
//! if !result.safe {
//!     println!("blocked: score {:.2}", result.score);
//! }
//! ```

pub mod cdr;
pub mod encoding;
pub mod entropy;
pub mod language;
pub mod many_shot;
pub mod models;
pub mod patterns;
pub mod perplexity;
pub mod quarantine;
pub mod scanner;

pub use models::{Detection, DetectionKind, ScanResult, ScannerError, Sensitivity, Severity};
pub use quarantine::Quarantine;
pub use scanner::{InputScanner, ScannerConfig};
