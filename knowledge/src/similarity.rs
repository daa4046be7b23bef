//! Token-overlap similarity between questions.

use std::collections::HashSet;

/// Lower-cased whitespace tokens of `text`.
pub fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Compute the Jaccard index of the token sets of `a` and `b`.
///
/// Returns a value between 0.0 and 1.0, where:
/// - 1.0 means both strings contain exactly the same tokens
/// - 0.0 means no shared tokens, or either string has no tokens at all
pub fn score(a: &str, b: &str) -> f32 {
    let ta = tokens(a);
    let tb = tokens(b);
    jaccard(&ta, &tb)
}

/// Jaccard index of two pre-tokenized sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();

    intersection as f32 / union as f32
}
