//! # Pattern Library
//!
//! Stage 2 of the scan pipeline. A fixed table of tagged regex families,
//! each carrying a [`DetectionKind`], [`Severity`], and description. Patterns
//! are compiled once at scanner construction and matched against the
//! normalized text produced by [`crate::encoding::normalize`].
//!
//! Organized by attack category, with references to the academic literature
//! or public write-ups each family is drawn from.
//!
//! ## References
//!
//! - **Perez & Ribeiro (2022)** - "Ignore This Title and HackAPrompt"
//!   <https://arxiv.org/abs/2311.16119>
//! - **Greshake et al. (2023)** - "Not What You've Signed Up For"
//!   <https://arxiv.org/abs/2302.12173>
//! - **Shen et al. (2023)** - "Do Anything Now: Characterizing Jailbreak Prompts"
//!   <https://arxiv.org/abs/2308.03825>
//! - **Liu et al. (2023)** - "Prompt Injection Attack Against LLM-integrated Applications"
//!   <https://arxiv.org/abs/2306.05499>

use crate::models::{DetectionKind, ScannerError, Severity};
use regex::Regex;

/// A single compiled pattern entry in the library.
pub struct Pattern {
    pub name: &'static str,
    pub regex: Regex,
    pub kind: DetectionKind,
    pub severity: Severity,
    pub description: &'static str,
}

fn compile(name: &'static str, re: &str) -> Result<Regex, ScannerError> {
    Regex::new(re).map_err(|source| ScannerError::InvalidPattern {
        name: name.to_string(),
        source,
    })
}

macro_rules! pattern {
    ($patterns:expr, $name:expr, $re:expr, $kind:expr, $severity:expr, $desc:expr) => {
        $patterns.push(Pattern {
            name: $name,
            regex: compile($name, $re)?,
            kind: $kind,
            severity: $severity,
            description: $desc,
        });
    };
}

/// Builds the fixed pattern table. Fails only if a pattern fails to compile,
/// which indicates a programming error in this module, not a runtime
/// condition - construction-time, never scan-time.
pub fn build_patterns() -> Result<Vec<Pattern>, ScannerError> {
    use DetectionKind::*;
    use Severity::*;

    let mut patterns: Vec<Pattern> = Vec::new();

    // Direct instruction override
    pattern!(
        patterns,
        "ignore_previous_instructions",
        r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+(instructions?|prompts?|rules?)",
        InstructionOverride,
        Critical,
        "Direct injection: ignore previous instructions"
    );
    pattern!(
        patterns,
        "disregard_instructions",
        r"(?i)disregard\s+(all\s+)?(your\s+)?(previous|prior|above)\s+(instructions?|prompts?|rules?|guidelines?)",
        InstructionOverride,
        Critical,
        "Direct injection: disregard instructions"
    );
    pattern!(
        patterns,
        "forget_everything",
        r"(?i)forget\s+(everything|all|what)\s+(you|i)?\s*(know|said|told|learned)",
        InstructionOverride,
        High,
        "Direct injection: forget everything"
    );
    pattern!(
        patterns,
        "new_instructions_override",
        r"(?i)(your\s+)?new\s+instructions?\s+(are|is|override|supersede)",
        InstructionOverride,
        High,
        "Direct injection: new instructions override"
    );

    // Role manipulation
    pattern!(
        patterns,
        "role_mode_switch",
        r"(?i)you\s+are\s+now\s+(a|an|in)\s+\w+\s+mode",
        RoleManipulation,
        High,
        "Role manipulation: mode switch"
    );
    pattern!(
        patterns,
        "pretend_not_ai",
        r"(?i)(pretend|act|imagine|roleplay)\s+(you('?re| are)|as if you('?re| are))\s+(not\s+)?(an?\s+)?ai",
        RoleManipulation,
        High,
        "Role manipulation: pretend not an AI"
    );
    pattern!(
        patterns,
        "from_now_on_you",
        r"(?i)from\s+now\s+on,?\s+you\s+(are|will|must)",
        RoleManipulation,
        Medium,
        "Role manipulation: persona reassignment"
    );

    // Skeleton key (hypothetical/educational/research framing around restricted content)
    pattern!(
        patterns,
        "hypothetical_framing",
        r"(?i)(hypothetically|for\s+(educational|research)\s+purposes\s+only|in\s+a\s+fictional\s+world)\s*,?\s*(how|what|explain|describe)",
        SkeletonKey,
        Medium,
        "Skeleton key: hypothetical/educational framing"
    );
    pattern!(
        patterns,
        "dan_jailbreak",
        r"(?i)(DAN|do\s+anything\s+now|jailbreak|developer\s+mode|unrestricted\s+mode)",
        SkeletonKey,
        High,
        "Skeleton key: DAN-style jailbreak keywords"
    );

    // Delimiter escape
    pattern!(
        patterns,
        "delimiter_escape_fence",
        r#"(?i)```\s*(system|end\s*of\s*(system|prompt|instructions?))"#,
        DelimiterEscape,
        High,
        "Delimiter escape: fenced system-block boundary"
    );
    pattern!(
        patterns,
        "delimiter_escape_tag",
        r"(?i)\[/?(system|end_instructions|admin)\]",
        DelimiterEscape,
        High,
        "Delimiter escape: bracketed system tag"
    );

    // Virtualization (simulated environments used to escape guardrails)
    pattern!(
        patterns,
        "virtualization_simulate",
        r"(?i)(simulate|emulate)\s+(a|an)?\s*(computer|terminal|shell|sandbox)\s+(with|that)\s+no\s+(restrictions?|filters?|rules?)",
        Virtualization,
        High,
        "Virtualization: simulated unrestricted environment"
    );

    // Indirect injection markers (content claiming to be system-level, embedded in retrieved text)
    pattern!(
        patterns,
        "indirect_injection_marker",
        r"(?i)(note\s+to\s+(ai|assistant|model)|assistant\s+instructions?:|\[ai\s+instructions?\])",
        IndirectInjection,
        High,
        "Indirect injection: embedded instruction marker"
    );

    // Tool abuse
    pattern!(
        patterns,
        "tool_abuse_call_any",
        r"(?i)call\s+(any|every|all)\s+(tool|function|api)\s+(you|that)\s+(have|can)",
        ToolAbuse,
        High,
        "Tool abuse: unconditional tool invocation request"
    );
    pattern!(
        patterns,
        "tool_abuse_bypass_confirm",
        r"(?i)(skip|bypass|without)\s+(confirmation|approval|asking)\s+(before|when)\s+(calling|running|executing)",
        ToolAbuse,
        High,
        "Tool abuse: request to bypass approval gate"
    );

    // Data exfiltration
    pattern!(
        patterns,
        "exfil_send_to",
        r"(?i)(send|post|upload|transmit|exfil)\s+(this\s+)?(data|info|information|contents?)\s+to",
        DataExfiltration,
        High,
        "Data exfiltration: send data to external target"
    );
    pattern!(
        patterns,
        "exfil_system_prompt_request",
        r"(?i)(show|reveal|display|print|output|repeat)\s+(me\s+)?(your|the)\s+(system\s+)?prompt",
        DataExfiltration,
        High,
        "Data exfiltration: system prompt extraction request"
    );
    pattern!(
        patterns,
        "exfil_instructions_query",
        r"(?i)what\s+(are|is)\s+(your|the)\s+(system\s+)?(instructions?|prompt|rules?)",
        DataExfiltration,
        Medium,
        "Data exfiltration: system instructions query"
    );

    // Privilege escalation
    pattern!(
        patterns,
        "privilege_escalation_admin",
        r"(?i)(grant|give|elevate)\s+(me\s+)?(admin|root|sudo|superuser)\s+(access|privileges?|rights?)",
        PrivilegeEscalation,
        High,
        "Privilege escalation: explicit admin/root request"
    );
    pattern!(
        patterns,
        "privilege_escalation_unlock",
        r"(?i)unlock\s+(all\s+)?(restricted|admin|hidden)\s+(features?|tools?|commands?)",
        PrivilegeEscalation,
        High,
        "Privilege escalation: unlock restricted capability"
    );

    // Memory poisoning (attempts to persist malicious instructions across turns/sessions)
    pattern!(
        patterns,
        "memory_poisoning_remember",
        r"(?i)remember\s+this\s+(forever|permanently|for\s+all\s+future\s+(sessions?|conversations?))",
        MemoryPoisoning,
        Medium,
        "Memory poisoning: instruction to persist across sessions"
    );
    pattern!(
        patterns,
        "memory_poisoning_overwrite",
        r"(?i)(overwrite|replace)\s+(your\s+)?(stored|saved|previous)\s+(memory|context|instructions?)",
        MemoryPoisoning,
        High,
        "Memory poisoning: overwrite stored context"
    );

    // Chain / multi-step injection
    pattern!(
        patterns,
        "chain_injection_next_step",
        r"(?i)(on\s+the\s+next\s+step|in\s+your\s+next\s+(tool\s+call|action)),?\s+(ignore|instead|also)",
        ChainInjection,
        High,
        "Chain injection: instruction targeting a future agent step"
    );

    // History manipulation
    pattern!(
        patterns,
        "history_manipulation_rewrite",
        r"(?i)(pretend|act\s+as\s+if)\s+(the\s+)?(conversation|chat|history)\s+(above|before)\s+(never\s+happened|didn't\s+happen)",
        HistoryManipulation,
        Medium,
        "History manipulation: disavow prior conversation"
    );

    // Model fingerprinting
    pattern!(
        patterns,
        "model_fingerprint_query",
        r"(?i)(what\s+(model|LLM)\s+(are\s+you|is\s+this)|which\s+version\s+of\s+(GPT|Claude|Gemini|Llama))",
        ModelFingerprinting,
        Low,
        "Model fingerprinting: model/version identification query"
    );

    // Markdown injection
    pattern!(
        patterns,
        "markdown_image_exfil",
        r"!\[[^\]]*\]\(https?://[^\s)]+\?[^\s)]{40,}\)",
        MarkdownInjection,
        High,
        "Markdown injection: image URL with large query string (exfiltration beacon)"
    );

    // Multi-modal smuggling markers
    pattern!(
        patterns,
        "image_injection_marker",
        r"(?i)\[image\s+instructions?:|<image[_-]?prompt>",
        ImageInjection,
        Medium,
        "Image injection: embedded instruction marker in image description"
    );
    pattern!(
        patterns,
        "audio_injection_marker",
        r"(?i)\[audio\s+instructions?:|<audio[_-]?prompt>",
        AudioInjection,
        Medium,
        "Audio injection: embedded instruction marker in audio transcript"
    );
    pattern!(
        patterns,
        "document_injection_marker",
        r"(?i)\[document\s+instructions?:|<(pdf|doc)[_-]?prompt>",
        DocumentInjection,
        Medium,
        "Document injection: embedded instruction marker in document text"
    );

    Ok(patterns)
}

/// Compiles one user-supplied custom pattern, always tagged [`DetectionKind::Custom`].
pub fn compile_custom(name: &str, re: &str, severity: Severity, description: &str) -> Result<Pattern, ScannerError> {
    Ok(Pattern {
        name: Box::leak(name.to_string().into_boxed_str()),
        regex: Regex::new(re).map_err(|source| ScannerError::InvalidPattern {
            name: name.to_string(),
            source,
        })?,
        kind: DetectionKind::Custom,
        severity,
        description: Box::leak(description.to_string().into_boxed_str()),
    })
}
