use super::morphology::variants;

/// Case-insensitive Levenshtein distance (unit cost insert/delete/substitute).
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// `1 - distance / max_len`, in `[0, 1]`. Two empty strings are identical.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Best containment ratio between any morphological variant of `term` and `word`.
///
/// A variant and the word overlap when either contains the other; the ratio is
/// the shorter length over the longer. Returns 0.0 when nothing overlaps.
pub fn substring_overlap(term: &str, word: &str) -> f64 {
    let word_len = word.chars().count();
    variants(term)
        .iter()
        .filter(|form| form.contains(word) || word.contains(form.as_str()))
        .filter_map(|form| {
            let form_len = form.chars().count();
            let longest = form_len.max(word_len);
            (longest > 0).then(|| form_len.min(word_len) as f64 / longest as f64)
        })
        .fold(0.0, f64::max)
}
