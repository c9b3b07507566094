//! Text similarity helpers used by the scoring and pruning paths.

/// Case-insensitive substring containment.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// True when any of the terms appears in the content (case-insensitive).
pub fn contains_any_ci(content: &str, terms: &[String]) -> bool {
    let lower = content.to_lowercase();
    terms
        .iter()
        .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
}

/// Jaccard similarity over lowercased whitespace-separated word sets.
pub fn word_jaccard(a: &str, b: &str) -> f32 {
    let words_a: std::collections::HashSet<String> =
        a.to_lowercase().split_whitespace().map(String::from).collect();
    let words_b: std::collections::HashSet<String> =
        b.to_lowercase().split_whitespace().map(String::from).collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    intersection as f32 / union as f32
}

/// Similarity between two formulas after normalization (spaces stripped,
/// lowercased). Exact matches score 1.0; otherwise the positional character
/// overlap relative to the shorter formula.
pub fn formula_similarity(a: &str, b: &str) -> f32 {
    let norm_a: String = a.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
    let norm_b: String = b.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();

    if norm_a == norm_b {
        return 1.0;
    }

    let (shorter, longer) = if norm_a.len() <= norm_b.len() {
        (norm_a, norm_b)
    } else {
        (norm_b, norm_a)
    };
    if shorter.is_empty() {
        return 0.0;
    }

    let longer_chars: Vec<char> = longer.chars().collect();
    let matches = shorter
        .chars()
        .enumerate()
        .filter(|(i, c)| longer_chars.get(*i) == Some(c))
        .count();
    matches as f32 / shorter.chars().count() as f32
}
