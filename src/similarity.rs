//! Fuzzy word and line similarity.
//!
//! Words are compared position by position over the shorter word only, so a
//! shifted insertion counts as a full mismatch. Lines are compared as bags of
//! lowercase words where near-identical words are merged before averaging.

use std::collections::HashMap;

/// Minimum per-word ratio for two words to count as the same word.
pub const WORD_RATIO_MIN: f64 = 0.75;
/// Two words must differ in fewer than this many positions to match.
pub const WORD_DISTANCE_MAX: usize = 4;

/// Compare two words position-wise.
///
/// Returns `(ratio, distance)` where `ratio` is the share of equal positions
/// (over the shorter word) relative to the longer word, and `distance` is the
/// number of positions of the longer word left unmatched.
pub fn word_similarity(first: &str, second: &str) -> (f64, usize) {
    let longest = first.chars().count().max(second.chars().count());
    if longest == 0 {
        return (0.0, 0);
    }
    let same = first
        .chars()
        .zip(second.chars())
        .filter(|(a, b)| a == b)
        .count();
    (same as f64 / longest as f64, longest - same)
}

/// Distinct lowercase tokens of a line with their counts, in first-seen order.
fn token_counts(line: &str) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for token in line.to_lowercase().split_whitespace() {
        match index.get(token) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(token.to_string(), order.len());
                order.push((token.to_string(), 1));
            }
        }
    }
    order
}

/// Compare two lines as fuzzy bags of words, returning a value in `[0, 1]`.
///
/// Every distinct token of either line starts with weight 0. For each pair of
/// tokens that match (see [`word_similarity`]) the first line's token gets the
/// ratio of the smaller to the larger occurrence count. A non-exact match also
/// drops the second line's token so a typo is not scored twice. The result is
/// the mean weight over whatever tokens remain.
pub fn line_similarity(first: &str, second: &str) -> f64 {
    let first_tokens = token_counts(first);
    let second_tokens = token_counts(second);

    let mut weights: HashMap<&str, f64> = HashMap::new();
    for (token, _) in first_tokens.iter().chain(second_tokens.iter()) {
        weights.insert(token.as_str(), 0.0);
    }

    for (first_token, first_count) in &first_tokens {
        for (second_token, second_count) in &second_tokens {
            let (ratio, distance) = word_similarity(first_token, second_token);
            if ratio > WORD_RATIO_MIN && distance < WORD_DISTANCE_MAX {
                let weight = (*first_count).min(*second_count) as f64
                    / (*first_count).max(*second_count) as f64;
                weights.insert(first_token.as_str(), weight);
                if ratio < 1.0 {
                    weights.remove(second_token.as_str());
                }
            }
        }
    }

    if weights.is_empty() {
        return 0.0;
    }
    weights.values().sum::<f64>() / weights.len() as f64
}
