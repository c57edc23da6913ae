//! Similarity scoring functions
//!
//! The raw scoring math behind the built-in comparators. All functions
//! return a similarity in [0.0, 1.0] where 1.0 means identical.

use std::collections::HashSet;

/// Normalized edit-distance similarity between two strings
///
/// `1 - levenshtein / max_len`, so identical strings score 1.0 and
/// fully dissimilar strings score 0.0. Two empty strings are identical.
pub fn edit_distance_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b).clamp(0.0, 1.0)
}

/// Relative numeric similarity with a tolerance band
///
/// Differences within `tolerance * max(|a|, |b|)` score a full 1.0;
/// beyond the band the score decays as `1 - relative_diff`, floored at 0.
pub fn relative_number_similarity(a: f64, b: f64, tolerance: f64) -> f64 {
    let max = a.abs().max(b.abs());
    if max == 0.0 {
        return 1.0; // Both are zero, perfect match
    }
    let relative_diff = (a - b).abs() / max;
    if relative_diff <= tolerance {
        1.0
    } else {
        (1.0 - relative_diff).max(0.0)
    }
}

/// Absolute numeric similarity with a tolerance band
///
/// Differences within `tolerance` score 1.0; beyond it the score decays
/// exponentially against an adaptive scale.
pub fn absolute_number_similarity(a: f64, b: f64, tolerance: f64) -> f64 {
    let diff = (a - b).abs();
    if diff <= tolerance {
        return 1.0;
    }
    let scale = (a.abs() + b.abs() + 1.0) / 2.0; // Adaptive scale
    (-diff / scale).exp()
}

/// Jaccard similarity between whitespace token sets, lowercased
pub fn jaccard_tokens(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Character-trigram similarity between two strings
///
/// Fuzzy text matching over padded, lowercased trigram sets.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let trigrams_a = generate_trigrams(&a.to_lowercase());
    let trigrams_b = generate_trigrams(&b.to_lowercase());

    if trigrams_a.is_empty() && trigrams_b.is_empty() {
        return 1.0;
    }
    if trigrams_a.is_empty() || trigrams_b.is_empty() {
        return 0.0;
    }

    let intersection = trigrams_a.intersection(&trigrams_b).count();
    let union = trigrams_a.union(&trigrams_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Generate character trigrams from a string, with two-space padding
fn generate_trigrams(s: &str) -> HashSet<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();

    if chars.len() < 3 {
        return HashSet::new();
    }

    chars
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance_similarity() {
        assert_eq!(edit_distance_similarity("hello", "hello"), 1.0);
        assert_eq!(edit_distance_similarity("", ""), 1.0);
        // One deletion out of five characters.
        let sim = edit_distance_similarity("apple", "aple");
        assert!((sim - 0.8).abs() < 1e-9, "got {sim}");
        assert!(edit_distance_similarity("cherry", "orange") < 0.4);
    }

    #[test]
    fn test_relative_number_similarity() {
        assert_eq!(relative_number_similarity(10.0, 10.0, 0.01), 1.0);
        assert_eq!(relative_number_similarity(0.0, 0.0, 0.01), 1.0);
        // Within the band.
        assert_eq!(relative_number_similarity(1247.50, 1247.48, 0.01), 1.0);
        // Beyond the band the score decays.
        let sim = relative_number_similarity(10.0, 20.0, 0.01);
        assert!((sim - 0.5).abs() < 1e-9, "got {sim}");
        assert_eq!(relative_number_similarity(1.0, -1.0, 0.01), 0.0);
    }

    #[test]
    fn test_absolute_number_similarity() {
        assert_eq!(absolute_number_similarity(5.0, 5.2, 0.5), 1.0);
        let sim = absolute_number_similarity(10.0, 14.0, 0.5);
        assert!(sim < 1.0 && sim > 0.0);
    }

    #[test]
    fn test_jaccard_tokens() {
        assert_eq!(jaccard_tokens("red green blue", "BLUE green red"), 1.0);
        assert_eq!(jaccard_tokens("", ""), 1.0);
        let sim = jaccard_tokens("red green", "green yellow");
        assert!((sim - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_trigram_similarity() {
        let sim = trigram_similarity("prosciutto cotto", "prosciutto crudo");
        assert!(sim > 0.5); // Shared trigrams dominate
        assert!(trigram_similarity("apple", "banana") < 0.3);
        assert_eq!(trigram_similarity("", ""), 1.0);
    }

    #[test]
    fn test_trigram_generation() {
        let trigrams = generate_trigrams("hello");
        assert!(trigrams.contains("hel"));
        assert!(trigrams.contains("ell"));
        assert!(trigrams.contains("llo"));
    }
}
