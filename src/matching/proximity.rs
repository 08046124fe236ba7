use super::morphology::is_exact_match;

/// Sums `1 / (1 + d)` over every pair of distinct terms present in the field,
/// where `d` is the smallest token-index distance between their occurrences.
///
/// `terms` are expected lowercase and deduplicated; order only decides which
/// pairs are formed, not their contribution.
pub fn proximity_score(field: &str, terms: &[String]) -> f64 {
    let tokens: Vec<&str> = field.split_whitespace().collect();
    let positions: Vec<Vec<usize>> = terms
        .iter()
        .map(|term| {
            tokens
                .iter()
                .enumerate()
                .filter(|(_, token)| is_exact_match(term, token))
                .map(|(idx, _)| idx)
                .collect()
        })
        .collect();

    let mut total = 0.0;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            if let Some(distance) = min_distance(&positions[i], &positions[j]) {
                total += 1.0 / (1.0 + distance as f64);
            }
        }
    }
    total
}

fn min_distance(lhs: &[usize], rhs: &[usize]) -> Option<usize> {
    lhs.iter()
        .flat_map(|a| rhs.iter().map(move |b| a.abs_diff(*b)))
        .min()
}
