//! Near-duplicate text detection with hashed word shingles.
//!
//! Text is canonicalized into lowercase words, cut into overlapping windows of
//! [`SHINGLE_LEN`] words, and each window is hashed with CRC-32. Two texts are
//! compared by the share of shingles they have in common.

use std::collections::HashSet;

/// Number of words per shingle.
pub const SHINGLE_LEN: usize = 10;

const STOP_SYMBOLS: &[char] = &[
    '.', ',', '!', '?', ':', ';', '-', '\n', '\r', '(', ')', '<', '>', '1', '2', '3', '4', '5',
    '6', '7', '8', '9', '0',
];

// Short Russian function words found all over the test comments, plus the
// harness's own log-level tags.
const STOP_WORDS: &[&str] = &[
    "это", "как", "так", "и", "в", "над", "к", "до", "не", "на", "но", "за", "то", "с", "ли",
    "а", "во", "от", "со", "для", "о", "же", "ну", "вы", "бы", "что", "кто", "он", "она", "при",
    "log_debug", "log_info", "log_trace",
];

/// Lowercase, split on whitespace, strip stop symbols from both ends of every
/// word, and drop words that end up empty or are stop words.
pub fn canonicalize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(STOP_SYMBOLS))
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Hash every window of [`SHINGLE_LEN`] consecutive words.
///
/// Order and duplicates are kept; fewer than [`SHINGLE_LEN`] words yield no
/// shingles at all.
pub fn shingles(words: &[String]) -> Vec<u32> {
    words
        .windows(SHINGLE_LEN)
        .map(|window| crc32fast::hash(window.join(" ").as_bytes()))
        .collect()
}

/// Resemblance of two shingle sequences: `2 * matches / (len_a + len_b)`.
///
/// Every shingle of the shorter sequence is looked up in the whole longer
/// sequence, so repeated shingles may each count as a match against the same
/// shingle on the other side.
pub fn resemblance(first: &[u32], second: &[u32]) -> f64 {
    if first.is_empty() || second.is_empty() {
        return 0.0;
    }
    let (short, long) = if first.len() > second.len() {
        (second, first)
    } else {
        (first, second)
    };
    let lookup: HashSet<u32> = long.iter().copied().collect();
    let matches = short.iter().filter(|h| lookup.contains(h)).count();
    2.0 * matches as f64 / (short.len() + long.len()) as f64
}

/// Canonicalize, shingle and compare two texts. Empty text scores 0.0.
pub fn text_similarity(first: &str, second: &str) -> f64 {
    if first.is_empty() || second.is_empty() {
        return 0.0;
    }
    let a = shingles(&canonicalize(first));
    let b = shingles(&canonicalize(second));
    resemblance(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, prefix: &str) -> String {
        (0..n)
            .map(|i| format!("{prefix}{}", (b'a' + (i % 26) as u8) as char))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_canonicalize_strips_stop_words_and_symbols() {
        assert_eq!(canonicalize("Это лог 123 FAIL!"), vec!["лог", "fail"]);
    }

    #[test]
    fn test_canonicalize_log_level_tags() {
        let tokens = canonicalize("LOG_INFO (modem) ready; LOG_DEBUG <7>");
        assert_eq!(tokens, vec!["modem", "ready"]);
    }

    #[test]
    fn test_canonicalize_keeps_inner_punctuation() {
        assert_eq!(canonicalize("at+cgatt=1, ok."), vec!["at+cgatt=", "ok"]);
    }

    #[test]
    fn test_shingle_count() {
        let tokens = canonicalize(&words(12, "w"));
        assert_eq!(tokens.len(), 12);
        assert_eq!(shingles(&tokens).len(), 3);
        assert!(shingles(&tokens[..9]).is_empty());
        assert_eq!(shingles(&tokens[..10]).len(), 1);
    }

    #[test]
    fn test_shingle_is_crc32_of_joined_window() {
        let tokens: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
        let expected = crc32fast::hash(tokens.join(" ").as_bytes());
        assert_eq!(shingles(&tokens), vec![expected]);
    }

    #[test]
    fn test_resemblance_empty() {
        assert_eq!(resemblance(&[], &[1, 2]), 0.0);
        assert_eq!(resemblance(&[1], &[]), 0.0);
    }

    #[test]
    fn test_resemblance_self() {
        let s = vec![5, 9, 9, 12];
        assert!((resemblance(&s, &s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_resemblance_counts_duplicates_against_full_sequence() {
        // Both 7s in the short side match the single 7 in the long side.
        let score = resemblance(&[7, 7], &[7, 1, 2]);
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_text_similarity() {
        let a = words(20, "x");
        assert!((text_similarity(&a, &a) - 1.0).abs() < 1e-9);
        assert_eq!(text_similarity("", &a), 0.0);
        assert_eq!(text_similarity(&a, &words(20, "y")), 0.0);
    }
}
