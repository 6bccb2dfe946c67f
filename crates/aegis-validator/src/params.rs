//! # Parameter Safety Checks
//!
//! Two layers over proposed tool-call parameters: fixed metacharacter and
//! keyword denylists keyed off the parameter name (cheap, no scanner
//! dependency), and an optional recursive scan of every string leaf through
//! the Input Scanner for anything the denylists miss.

use std::collections::HashMap;

use aegis_scanner::quarantine::{Quarantine, QuarantineOptions, Source};
use aegis_scanner::scanner::InputScanner;
use serde_json::Value;

const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')'];
const SQL_INJECTION_TOKENS: &[&str] = &["'", "--", ";", "union", "drop", "delete"];

/// A single parameter (or nested JSON path) that failed a safety check.
#[derive(Debug, Clone)]
pub struct UnsafeParameter {
    pub path: String,
    pub reason: String,
}

/// Checks the fixed denylists against one parameter map. Only keys whose
/// name contains `command` or `query` (case-insensitive) are checked.
pub fn check_parameter_safety(params: &HashMap<String, Value>) -> Option<UnsafeParameter> {
    for (key, value) in params {
        let lower_key = key.to_lowercase();
        let Some(text) = value.as_str() else { continue };

        if lower_key.contains("command") {
            if let Some(c) = text.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
                return Some(UnsafeParameter {
                    path: key.clone(),
                    reason: format!("shell metacharacter `{c}` in command parameter"),
                });
            }
        }

        if lower_key.contains("query") {
            let lower_value = text.to_lowercase();
            if let Some(token) = SQL_INJECTION_TOKENS.iter().find(|t| lower_value.contains(**t)) {
                return Some(UnsafeParameter {
                    path: key.clone(),
                    reason: format!("SQL-injection-shaped token `{token}` in query parameter"),
                });
            }
        }
    }
    None
}

/// Recursively walks `value`, quarantining and scanning every string leaf
/// with `scanner`. Returns the first unsafe finding, citing its JSON path.
pub fn scan_mcp_parameters(scanner: &InputScanner, value: &Value, path: &str) -> Option<UnsafeParameter> {
    match value {
        Value::String(s) => {
            let quarantined =
                Quarantine::new(s.clone(), Source::McpToolOutput, QuarantineOptions::default());
            let result = scanner.scan(quarantined);
            if result.safe {
                None
            } else {
                let summary = result
                    .detections
                    .iter()
                    .map(|d| d.pattern.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(UnsafeParameter {
                    path: path.to_string(),
                    reason: format!("unsafe content detected ({summary})"),
                })
            }
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| scan_mcp_parameters(scanner, v, &format!("{path}[{i}]"))),
        Value::Object(map) => map.iter().find_map(|(k, v)| {
            let child_path = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
            scan_mcp_parameters(scanner, v, &child_path)
        }),
        _ => None,
    }
}
