use std::collections::HashSet;

/// Lowercases and strips ASCII punctuation.
pub(crate) fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect()
}

fn ngrams(words: &[&str], n: usize) -> HashSet<String> {
    if words.len() < n {
        return HashSet::new();
    }
    words.windows(n).map(|w| w.join(" ")).collect()
}

/// Jaccard index, zero when either side is empty.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Word n-gram overlap of two normalized texts: 0.4 bigram + 0.6 trigram
/// Jaccard.
pub(crate) fn text_similarity(a: &str, b: &str) -> f64 {
    let wa: Vec<&str> = a.split_whitespace().collect();
    let wb: Vec<&str> = b.split_whitespace().collect();
    let bigram = jaccard(&ngrams(&wa, 2), &ngrams(&wb, 2));
    let trigram = jaccard(&ngrams(&wa, 3), &ngrams(&wb, 3));
    bigram * 0.4 + trigram * 0.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_ascii_punctuation() {
        assert_eq!(normalize("Hello, World! It's fine."), "hello world its fine");
    }

    #[test]
    fn identical_texts_are_fully_similar() {
        let t = "the quick brown fox jumps";
        assert!((text_similarity(t, t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn short_texts_have_zero_similarity() {
        assert_eq!(text_similarity("hi", "hi"), 0.0);
        assert_eq!(text_similarity("", "anything at all"), 0.0);
    }

    #[test]
    fn two_word_texts_only_use_bigrams() {
        assert!((text_similarity("hi there", "hi there") - 0.4).abs() < 1e-9);
    }
}
