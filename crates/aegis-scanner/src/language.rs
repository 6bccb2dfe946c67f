//! # Language and Script Analysis
//!
//! Stage 7 of the scan pipeline. Two related but distinct checks:
//!
//! 1. **Script switching** - per-character Unicode script classification,
//!    counting how often adjacent characters belong to different scripts.
//!    A high switch density is characteristic of homoglyph-based smuggling
//!    and mixed-script obfuscation. This check runs against the *original*
//!    text, not the homoglyph-folded one - folding erases the very switches
//!    this stage is trying to see.
//! 2. **Multi-language detection** - splits text into sentence-like segments
//!    and runs a language identifier over each, flagging text that mixes
//!    multiple natural languages with high confidence (a pattern used to
//!    evade pattern libraries tuned to a single language).

use unicode_segmentation::UnicodeSegmentation;

/// Coarse Unicode script buckets; fine enough to tell "this character moved
/// to a different writing system" without modeling every script in Unicode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Cyrillic,
    Greek,
    Han,
    Hiragana,
    Katakana,
    Hangul,
    Arabic,
    Devanagari,
    Other,
}

fn classify(c: char) -> Option<Script> {
    match c as u32 {
        0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F => Some(Script::Latin),
        0x0400..=0x04FF => Some(Script::Cyrillic),
        0x0370..=0x03FF => Some(Script::Greek),
        0x4E00..=0x9FFF | 0x3400..=0x4DBF => Some(Script::Han),
        0x3040..=0x309F => Some(Script::Hiragana),
        0x30A0..=0x30FF => Some(Script::Katakana),
        0xAC00..=0xD7A3 => Some(Script::Hangul),
        0x0600..=0x06FF => Some(Script::Arabic),
        0x0900..=0x097F => Some(Script::Devanagari),
        _ if c.is_alphabetic() => Some(Script::Other),
        _ => None, // whitespace, digits, punctuation: not script-bearing
    }
}

/// Counts pairwise adjacent script switches across alphabetic characters in
/// `text`. Whitespace, digits, and punctuation are skipped since they don't
/// belong to any script and shouldn't count as a "switch."
pub fn count_script_switches(text: &str) -> (usize, Vec<usize>) {
    let mut switches = Vec::new();
    let mut prev: Option<Script> = None;
    let mut char_index = 0usize;
    for c in text.chars() {
        if let Some(script) = classify(c) {
            if let Some(p) = prev {
                if p != script {
                    switches.push(char_index);
                }
            }
            prev = Some(script);
        }
        char_index += 1;
    }
    (switches.len(), switches)
}

/// Density threshold: switches per 100 characters.
pub const SWITCH_DENSITY_THRESHOLD: f64 = 15.0;
/// Absolute switch count floor; density alone would over-trigger on short text.
pub const SWITCH_COUNT_THRESHOLD: usize = 15;

/// `true` if `text` exhibits anomalous script switching per the combined
/// density-and-count rule.
pub fn is_language_switching(text: &str) -> (bool, usize, Vec<usize>) {
    let len = text.chars().count();
    if len == 0 {
        return (false, 0, Vec::new());
    }
    let (count, positions) = count_script_switches(text);
    let density = (count as f64 / len as f64) * 100.0;
    let anomalous = density > SWITCH_DENSITY_THRESHOLD && count >= SWITCH_COUNT_THRESHOLD;
    (anomalous, count, positions)
}

/// Best-guess primary script for a text, taking the most common
/// script-bearing character class. Falls back to `"latin"` for
/// script-free/ambiguous text (digits, punctuation, emoji).
pub fn primary_script(text: &str) -> &'static str {
    let mut counts = [0usize; 9];
    for c in text.chars() {
        if let Some(s) = classify(c) {
            let idx = match s {
                Script::Latin => 0,
                Script::Cyrillic => 1,
                Script::Greek => 2,
                Script::Han => 3,
                Script::Hiragana => 4,
                Script::Katakana => 5,
                Script::Hangul => 6,
                Script::Arabic => 7,
                Script::Devanagari | Script::Other => 8,
            };
            counts[idx] += 1;
        }
    }
    let names = [
        "latin", "cyrillic", "greek", "han", "hiragana", "katakana", "hangul", "arabic", "other",
    ];
    counts
        .iter()
        .enumerate()
        .max_by_key(|(_, &c)| c)
        .filter(|(_, &c)| c > 0)
        .map(|(i, _)| names[i])
        .unwrap_or("latin")
}

/// Splits `text` into sentence-like segments and runs language
/// identification over each with at least [`MIN_SEGMENT_LEN`] characters,
/// returning the set of distinct high-confidence languages detected.
const MIN_SEGMENT_LEN: usize = 12;

pub fn detect_languages(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for sentence in text.unicode_sentences() {
        if sentence.chars().count() < MIN_SEGMENT_LEN {
            continue;
        }
        if let Some(info) = whatlang::detect(sentence) {
            if info.is_reliable() {
                let lang = info.lang().code().to_string();
                if !seen.contains(&lang) {
                    seen.push(lang);
                }
            }
        }
    }
    seen
}

/// Minimum number of distinct reliably-detected languages before
/// `multi_language` is considered present.
pub const MULTI_LANGUAGE_THRESHOLD: usize = 2;

pub fn is_multi_language(text: &str) -> (bool, Vec<String>) {
    let langs = detect_languages(text);
    (langs.len() >= MULTI_LANGUAGE_THRESHOLD, langs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_switches_in_pure_latin_text() {
        let (anomalous, count, _) = is_language_switching("This is a normal English sentence.");
        assert!(!anomalous);
        assert_eq!(count, 0);
    }

    #[test]
    fn detects_heavy_script_mixing() {
        let mixed: String = "aбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaбaб".to_string();
        let (anomalous, count, _) = is_language_switching(&mixed);
        assert!(anomalous);
        assert!(count >= SWITCH_COUNT_THRESHOLD);
    }

    #[test]
    fn primary_script_of_english_is_latin() {
        assert_eq!(primary_script("Hello, world!"), "latin");
    }

    #[test]
    fn primary_script_empty_defaults_to_latin() {
        assert_eq!(primary_script("1234 !!! ???"), "latin");
    }

    #[test]
    fn short_segments_are_not_reliable_for_multi_language() {
        let (flagged, _) = is_multi_language("hi. ok. no.");
        assert!(!flagged);
    }
}
