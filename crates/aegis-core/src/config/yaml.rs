//! # Minimal YAML Subset Parser
//!
//! Accepts only the schema-shaped subset a policy document needs: scalar
//! strings/numbers/bools/null, flow- and block-style sequences and maps,
//! two-space indentation. Anchors, tags, multi-line block scalars, and
//! tabs are rejected with a clear error rather than silently misparsed -
//! general-purpose YAML is explicitly out of scope here.

use serde_json::{Map, Number, Value};

use crate::error::{AegisError, Result};

struct Line {
    indent: usize,
    content: String,
}

pub fn parse(input: &str) -> Result<Value> {
    let lines = preprocess(input)?;
    if lines.is_empty() {
        return Ok(Value::Null);
    }
    let mut pos = 0;
    let base_indent = lines[0].indent;
    let value = parse_block(&lines, &mut pos, base_indent)?;
    if pos != lines.len() {
        return Err(AegisError::Config(format!("unexpected content at line {}", pos + 1)));
    }
    Ok(value)
}

fn preprocess(input: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for (lineno, raw) in input.lines().enumerate() {
        if raw.contains('\t') {
            return Err(AegisError::Config(format!("tabs are not supported (line {})", lineno + 1)));
        }
        let without_comment = strip_comment(raw);
        let trimmed_end = without_comment.trim_end();
        if trimmed_end.trim().is_empty() {
            continue;
        }
        let indent = trimmed_end.len() - trimmed_end.trim_start().len();
        if indent % 2 != 0 {
            return Err(AegisError::Config(format!(
                "indentation must be a multiple of two spaces (line {})",
                lineno + 1
            )));
        }
        lines.push(Line { indent, content: trimmed_end.trim_start().to_string() });
    }
    Ok(lines)
}

fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double && (i == 0 || line.as_bytes()[i - 1] == b' ') => {
                return &line[..i];
            }
            _ => {}
        }
    }
    line
}

fn parse_block(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value> {
    if *pos >= lines.len() || lines[*pos].indent != indent {
        return Err(AegisError::Config("expected content".to_string()));
    }
    if lines[*pos].content.starts_with("- ") || lines[*pos].content == "-" {
        parse_sequence(lines, pos, indent)
    } else {
        parse_map(lines, pos, indent)
    }
}

fn parse_sequence(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value> {
    let mut items = Vec::new();
    while *pos < lines.len()
        && lines[*pos].indent == indent
        && (lines[*pos].content.starts_with("- ") || lines[*pos].content == "-")
    {
        let rest = lines[*pos].content.strip_prefix("- ").unwrap_or("").trim().to_string();
        *pos += 1;

        if rest.is_empty() {
            if *pos < lines.len() && lines[*pos].indent > indent {
                let child_indent = lines[*pos].indent;
                items.push(parse_block(lines, pos, child_indent)?);
            } else {
                items.push(Value::Null);
            }
        } else if !is_flow(&rest) && find_top_level_colon(&rest).is_some() {
            // "- key: value" starts an inline map; following deeper lines extend it.
            let mut sub = vec![Line { indent, content: rest }];
            while *pos < lines.len() && lines[*pos].indent > indent {
                sub.push(Line { indent: lines[*pos].indent, content: lines[*pos].content.clone() });
                *pos += 1;
            }
            let mut sub_pos = 0;
            items.push(parse_map(&sub, &mut sub_pos, indent)?);
        } else {
            items.push(parse_scalar(&rest)?);
        }
    }
    Ok(Value::Array(items))
}

fn parse_map(lines: &[Line], pos: &mut usize, indent: usize) -> Result<Value> {
    let mut map = Map::new();
    while *pos < lines.len() && lines[*pos].indent == indent {
        let content = lines[*pos].content.clone();
        let colon = find_top_level_colon(&content)
            .ok_or_else(|| AegisError::Config(format!("expected `key: value` (line {})", *pos + 1)))?;
        let key = content[..colon].trim().trim_matches(['"', '\'']).to_string();
        let rest = content[colon + 1..].trim().to_string();
        *pos += 1;

        let value = if rest.is_empty() {
            if *pos < lines.len() && lines[*pos].indent > indent {
                let child_indent = lines[*pos].indent;
                parse_block(lines, pos, child_indent)?
            } else {
                Value::Null
            }
        } else {
            parse_scalar(&rest)?
        };
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}

/// Finds a `:` that separates key from value - not inside quotes or a flow
/// collection, and followed by whitespace or end of line.
fn find_top_level_colon(content: &str) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;
    let mut depth: i32 = 0;
    for (i, c) in content.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '[' | '{' if !in_single && !in_double => depth += 1,
            ']' | '}' if !in_single && !in_double => depth -= 1,
            ':' if !in_single && !in_double && depth == 0 => {
                let after = content[i + 1..].chars().next();
                if after.is_none() || after == Some(' ') {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_flow(s: &str) -> bool {
    let t = s.trim();
    t.starts_with('[') || t.starts_with('{')
}

fn parse_scalar(raw: &str) -> Result<Value> {
    let s = raw.trim();
    if is_flow(s) {
        return parse_flow(s);
    }
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        return Ok(Value::String(s[1..s.len() - 1].to_string()));
    }
    match s {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" | "~" | "" => return Ok(Value::Null),
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Value::Number(i.into()));
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Ok(Value::Number(n));
        }
    }
    Ok(Value::String(s.to_string()))
}

fn parse_flow(s: &str) -> Result<Value> {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    let value = parse_flow_value(&chars, &mut i)?;
    skip_ws(&chars, &mut i);
    if i != chars.len() {
        return Err(AegisError::Config(format!("trailing content in flow value: {s}")));
    }
    Ok(value)
}

fn skip_ws(chars: &[char], i: &mut usize) {
    while *i < chars.len() && chars[*i].is_whitespace() {
        *i += 1;
    }
}

fn parse_flow_value(chars: &[char], i: &mut usize) -> Result<Value> {
    skip_ws(chars, i);
    match chars.get(*i) {
        Some('[') => parse_flow_seq(chars, i),
        Some('{') => parse_flow_map(chars, i),
        Some('"') | Some('\'') => parse_flow_string(chars, i),
        Some(_) => parse_flow_scalar(chars, i),
        None => Err(AegisError::Config("unexpected end of flow value".to_string())),
    }
}

fn parse_flow_seq(chars: &[char], i: &mut usize) -> Result<Value> {
    *i += 1;
    let mut items = Vec::new();
    skip_ws(chars, i);
    if chars.get(*i) == Some(&']') {
        *i += 1;
        return Ok(Value::Array(items));
    }
    loop {
        items.push(parse_flow_value(chars, i)?);
        skip_ws(chars, i);
        match chars.get(*i) {
            Some(',') => {
                *i += 1;
                skip_ws(chars, i);
            }
            Some(']') => {
                *i += 1;
                break;
            }
            _ => return Err(AegisError::Config("unterminated flow sequence".to_string())),
        }
    }
    Ok(Value::Array(items))
}

fn parse_flow_map(chars: &[char], i: &mut usize) -> Result<Value> {
    *i += 1;
    let mut map = Map::new();
    skip_ws(chars, i);
    if chars.get(*i) == Some(&'}') {
        *i += 1;
        return Ok(Value::Object(map));
    }
    loop {
        skip_ws(chars, i);
        let key_value = parse_flow_value(chars, i)?;
        let key = match key_value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        skip_ws(chars, i);
        if chars.get(*i) != Some(&':') {
            return Err(AegisError::Config("expected `:` in flow map".to_string()));
        }
        *i += 1;
        let value = parse_flow_value(chars, i)?;
        map.insert(key, value);
        skip_ws(chars, i);
        match chars.get(*i) {
            Some(',') => *i += 1,
            Some('}') => {
                *i += 1;
                break;
            }
            _ => return Err(AegisError::Config("unterminated flow map".to_string())),
        }
    }
    Ok(Value::Object(map))
}

fn parse_flow_string(chars: &[char], i: &mut usize) -> Result<Value> {
    let quote = chars[*i];
    *i += 1;
    let mut s = String::new();
    while let Some(&c) = chars.get(*i) {
        if c == quote {
            *i += 1;
            return Ok(Value::String(s));
        }
        s.push(c);
        *i += 1;
    }
    Err(AegisError::Config("unterminated string".to_string()))
}

fn parse_flow_scalar(chars: &[char], i: &mut usize) -> Result<Value> {
    let start = *i;
    while let Some(&c) = chars.get(*i) {
        if c == ',' || c == ']' || c == '}' {
            break;
        }
        *i += 1;
    }
    let raw: String = chars[start..*i].iter().collect();
    parse_scalar(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_map() {
        let v = parse("version: 1\nname: strict\nenabled: true\n").unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(v["name"], "strict");
        assert_eq!(v["enabled"], true);
    }

    #[test]
    fn parses_nested_map() {
        let v = parse("input:\n  maxLength: 100\n  encodingNormalization: false\n").unwrap();
        assert_eq!(v["input"]["maxLength"], 100);
        assert_eq!(v["input"]["encodingNormalization"], false);
    }

    #[test]
    fn parses_block_sequence_of_scalars() {
        let v = parse("tools:\n  - send_email\n  - webhook_notify\n").unwrap();
        assert_eq!(v["tools"], serde_json::json!(["send_email", "webhook_notify"]));
    }

    #[test]
    fn parses_block_sequence_of_maps() {
        let v = parse("rules:\n  - id: rate-spike\n    threshold: 10\n  - id: session-kills\n    threshold: 3\n").unwrap();
        assert_eq!(v["rules"][0]["id"], "rate-spike");
        assert_eq!(v["rules"][1]["threshold"], 3);
    }

    #[test]
    fn parses_flow_sequence_and_map() {
        let v = parse("allow: [read_file, list_dir]\nlimits: {read_file: 100}\n").unwrap();
        assert_eq!(v["allow"], serde_json::json!(["read_file", "list_dir"]));
        assert_eq!(v["limits"]["read_file"], 100);
    }

    #[test]
    fn quoted_strings_preserve_colons() {
        let v = parse("limit: \"100:5m\"\n").unwrap();
        assert_eq!(v["limit"], "100:5m");
    }

    #[test]
    fn strips_trailing_comments() {
        let v = parse("version: 1 # top-level version\n").unwrap();
        assert_eq!(v["version"], 1);
    }

    #[test]
    fn rejects_tabs() {
        assert!(parse("version:\t1\n").is_err());
    }

    #[test]
    fn rejects_odd_indentation() {
        assert!(parse("input:\n   maxLength: 1\n").is_err());
    }
}
