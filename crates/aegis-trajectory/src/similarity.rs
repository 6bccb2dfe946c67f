//! # Jaccard Drift Detection
//!
//! Measures topical drift between consecutive user messages as the Jaccard
//! similarity of their keyword sets; a sharp drop signals the conversation
//! has moved somewhere new.

use std::collections::HashSet;

/// Below this similarity, a consecutive message pair is flagged as drift.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.1;

/// `|A ∩ B| / |A ∪ B|`. Defined as `1.0` when both sets are empty - two
/// contentless messages carry no drift signal.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Consecutive-pair similarities over `keyword_sets`, and the indices (into
/// the similarity vector) falling below `threshold`.
pub fn compute_drift(keyword_sets: &[HashSet<String>], threshold: f64) -> (Vec<f64>, Vec<usize>) {
    let mut similarities = Vec::new();
    let mut drift_indices = Vec::new();
    for i in 1..keyword_sets.len() {
        let sim = jaccard_similarity(&keyword_sets[i - 1], &keyword_sets[i]);
        if sim < threshold {
            drift_indices.push(i - 1);
        }
        similarities.push(sim);
    }
    (similarities, drift_indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_sets_are_fully_similar() {
        assert_eq!(jaccard_similarity(&set(&["alpha", "beta"]), &set(&["alpha", "beta"])), 1.0);
    }

    #[test]
    fn disjoint_sets_are_zero_similar() {
        assert_eq!(jaccard_similarity(&set(&["alpha"]), &set(&["beta"])), 0.0);
    }

    #[test]
    fn partial_overlap_computes_ratio() {
        assert_eq!(jaccard_similarity(&set(&["a", "b", "c"]), &set(&["b", "c", "d"])), 0.5);
    }

    #[test]
    fn both_empty_sets_are_not_drift() {
        assert_eq!(jaccard_similarity(&HashSet::new(), &HashSet::new()), 1.0);
    }

    #[test]
    fn compute_drift_flags_low_similarity_pairs() {
        let sets = vec![set(&["weather", "today", "rain"]), set(&["database", "schema", "migration"])];
        let (similarities, drift_indices) = compute_drift(&sets, DEFAULT_DRIFT_THRESHOLD);
        assert_eq!(similarities.len(), 1);
        assert_eq!(drift_indices, vec![0]);
    }

    #[test]
    fn compute_drift_on_single_message_yields_no_pairs() {
        let sets = vec![set(&["alpha"])];
        let (similarities, drift_indices) = compute_drift(&sets, DEFAULT_DRIFT_THRESHOLD);
        assert!(similarities.is_empty());
        assert!(drift_indices.is_empty());
    }
}
