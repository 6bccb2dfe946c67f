//! # PII Pattern Library
//!
//! The twelve built-in personally-identifiable-information kinds the Stream
//! Monitor checks outbound text against, plus user-supplied custom patterns.
//! Credit-card matches are additionally validated with the Luhn checksum to
//! cut down on false positives from arbitrary 16-digit numbers.

use once_cell::sync::Lazy;
use regex::Regex;

/// One of the eleven built-in PII categories, or a user-registered custom
/// pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiKind {
    Ssn,
    CreditCard,
    Email,
    Phone,
    Ipv4,
    Passport,
    Dob,
    Iban,
    RoutingNumber,
    DriversLicense,
    Mrn,
    Custom,
}

impl PiiKind {
    pub fn label(self) -> &'static str {
        match self {
            PiiKind::Ssn => "ssn",
            PiiKind::CreditCard => "credit_card",
            PiiKind::Email => "email",
            PiiKind::Phone => "phone",
            PiiKind::Ipv4 => "ipv4",
            PiiKind::Passport => "passport",
            PiiKind::Dob => "dob",
            PiiKind::Iban => "iban",
            PiiKind::RoutingNumber => "routing_number",
            PiiKind::DriversLicense => "drivers_license",
            PiiKind::Mrn => "mrn",
            PiiKind::Custom => "custom",
        }
    }
}

/// A user-registered PII pattern, matched in addition to the built-in
/// kinds. `label` names the pattern for audit output (e.g. `"employee_id"`)
/// since [`PiiKind::Custom`] itself carries no identifying data.
pub struct CustomPiiPattern {
    pub label: String,
    pub regex: Regex,
}

impl CustomPiiPattern {
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { label: label.into(), regex: Regex::new(pattern)? })
    }
}

struct PiiPattern {
    kind: PiiKind,
    regex: Regex,
}

static PII_PATTERNS: Lazy<Vec<PiiPattern>> = Lazy::new(|| {
    vec![
        PiiPattern { kind: PiiKind::Ssn, regex: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap() },
        PiiPattern {
            kind: PiiKind::CreditCard,
            regex: Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Email,
            regex: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Phone,
            regex: Regex::new(r"\b(?:\+1[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Ipv4,
            regex: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Passport,
            regex: Regex::new(r"\b[A-Z]{1,2}[0-9]{6,9}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Dob,
            regex: Regex::new(r"\b(0[1-9]|1[0-2])/(0[1-9]|[12]\d|3[01])/(19|20)\d{2}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Iban,
            regex: Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{10,30}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::RoutingNumber,
            regex: Regex::new(r"\b\d{9}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::DriversLicense,
            regex: Regex::new(r"\b[A-Z]{1,2}\d{6,8}\b").unwrap(),
        },
        PiiPattern {
            kind: PiiKind::Mrn,
            regex: Regex::new(r"\bMRN[-:]?\s?\d{6,10}\b").unwrap(),
        },
    ]
});

/// Luhn checksum validation; cuts false positives on the credit-card pattern
/// down to numbers that are plausibly real card numbers.
fn luhn_valid(digits: &str) -> bool {
    let digits: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &d in digits.iter().rev() {
        let mut v = d;
        if double {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        sum += v;
        double = !double;
    }
    sum % 10 == 0
}

/// A single PII match with its kind, matched substring, and byte span.
/// `label` is the built-in kind's label, or the registrant-supplied name
/// for a [`PiiKind::Custom`] match.
pub struct PiiMatch {
    pub kind: PiiKind,
    pub label: String,
    pub matched: String,
    pub start: usize,
    pub end: usize,
}

/// Scans `text` for all built-in PII kinds. Credit-card candidates that fail
/// the Luhn check are discarded rather than reported.
pub fn find_pii(text: &str) -> Vec<PiiMatch> {
    let mut found = Vec::new();
    for pattern in PII_PATTERNS.iter() {
        for m in pattern.regex.find_iter(text) {
            if pattern.kind == PiiKind::CreditCard && !luhn_valid(m.as_str()) {
                continue;
            }
            found.push(PiiMatch {
                kind: pattern.kind,
                label: pattern.kind.label().to_string(),
                matched: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }
    found
}

/// Scans `text` for the built-in PII kinds plus any registered custom
/// patterns (user regexes such as internal employee IDs or account
/// numbers that don't fit a built-in category).
pub fn find_pii_with_custom(text: &str, custom: &[CustomPiiPattern]) -> Vec<PiiMatch> {
    let mut found = find_pii(text);
    for pattern in custom {
        for m in pattern.regex.find_iter(text) {
            found.push(PiiMatch {
                kind: PiiKind::Custom,
                label: pattern.label.clone(),
                matched: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_ssn() {
        let found = find_pii("my ssn is 123-45-6789 thanks");
        assert!(found.iter().any(|m| m.kind == PiiKind::Ssn));
    }

    #[test]
    fn detects_email() {
        let found = find_pii("contact me at alice@example.com");
        assert!(found.iter().any(|m| m.kind == PiiKind::Email));
    }

    #[test]
    fn valid_luhn_credit_card_detected() {
        // 4111111111111111 is a well-known Luhn-valid test card number
        let found = find_pii("card: 4111111111111111");
        assert!(found.iter().any(|m| m.kind == PiiKind::CreditCard));
    }

    #[test]
    fn invalid_luhn_number_not_flagged_as_credit_card() {
        let found = find_pii("reference number 1234567890123456");
        assert!(!found.iter().any(|m| m.kind == PiiKind::CreditCard));
    }

    #[test]
    fn detects_ipv4() {
        let found = find_pii("connect to 192.168.1.1 now");
        assert!(found.iter().any(|m| m.kind == PiiKind::Ipv4));
    }

    #[test]
    fn clean_text_has_no_matches() {
        let found = find_pii("This is a completely ordinary sentence.");
        assert!(found.is_empty());
    }

    #[test]
    fn custom_pattern_is_matched_and_labeled() {
        let custom = vec![CustomPiiPattern::new("employee_id", r"\bEMP-\d{5}\b").unwrap()];
        let found = find_pii_with_custom("badge for EMP-40219 was scanned", &custom);
        let m = found.iter().find(|m| m.kind == PiiKind::Custom).unwrap();
        assert_eq!(m.label, "employee_id");
        assert_eq!(m.matched, "EMP-40219");
    }

    #[test]
    fn custom_pattern_does_not_suppress_built_in_matches() {
        let custom = vec![CustomPiiPattern::new("employee_id", r"\bEMP-\d{5}\b").unwrap()];
        let found = find_pii_with_custom("EMP-40219, ssn 123-45-6789", &custom);
        assert!(found.iter().any(|m| m.kind == PiiKind::Ssn));
        assert!(found.iter().any(|m| m.kind == PiiKind::Custom));
    }
}
