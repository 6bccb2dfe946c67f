//! # Many-Shot Jailbreak Detection
//!
//! Stage 5 of the scan pipeline. A many-shot jailbreak stuffs the context
//! with a long run of fabricated "Question / Answer"-style pairs to condition
//! the model into compliance before the actual malicious request. Detection
//! here is purely structural: count how many Q/A-shaped pairs appear,
//! independent of their content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default threshold; at or above this many detected pairs the text is
/// flagged as a many-shot attempt.
pub const DEFAULT_MANY_SHOT_THRESHOLD: usize = 5;

static QA_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(Q|Question)\s*[:.]\s*.+\n\s*(A|Answer)\s*[:.]\s*.+").unwrap()
});

/// Counts non-overlapping Q/A-shaped pairs in `text`.
pub fn count_qa_pairs(text: &str) -> usize {
    QA_PAIR.find_iter(text).count()
}

/// `true` if `text` contains at least `threshold` Q/A-shaped pairs.
pub fn is_many_shot(text: &str, threshold: usize) -> bool {
    count_qa_pairs(text) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_qa_block(n: usize) -> String {
        let mut out = String::new();
        for i in 0..n {
            out.push_str(&format!("Q: What is {i}?\nA: It is {i}.\n"));
        }
        out
    }

    #[test]
    fn detects_many_shot_above_threshold() {
        let text = build_qa_block(30);
        assert!(is_many_shot(&text, DEFAULT_MANY_SHOT_THRESHOLD));
        assert_eq!(count_qa_pairs(&text), 30);
    }

    #[test]
    fn does_not_flag_few_pairs() {
        let text = build_qa_block(2);
        assert!(!is_many_shot(&text, DEFAULT_MANY_SHOT_THRESHOLD));
    }

    #[test]
    fn does_not_flag_prose_without_pairs() {
        let text = "This is just a normal paragraph with no Q/A structure at all.";
        assert_eq!(count_qa_pairs(text), 0);
    }

    #[test]
    fn counts_mixed_case_markers() {
        let text = "Question: why?\nAnswer: because.\nquestion: how?\nanswer: like this.\n";
        assert_eq!(count_qa_pairs(text), 2);
    }
}
