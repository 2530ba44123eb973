//! Weighted-ratio string similarity used to resolve free-text majors that the
//! curated dictionary does not know.
//!
//! Scores are on a 0-100 scale. The base `ratio` is the normalized Levenshtein
//! similarity; `WeightedRatio` layers token-order, token-set and partial
//! substring heuristics on top of it and keeps the best weighted score.

use std::collections::BTreeSet;

/// Pairwise similarity on a 0-100 scale
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, query: &str, choice: &str) -> f64;
}

/// The best-scoring choice for a query
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch<'a> {
    pub choice: &'a str,
    pub index: usize,
    pub score: f64,
}

/// Score `query` against every choice and return the first best one.
///
/// Ties keep the earliest choice, so the category list order is the tie-break.
pub fn extract_one<'a, S>(scorer: &S, query: &str, choices: &'a [String]) -> Option<BestMatch<'a>>
where
    S: SimilarityScorer + ?Sized,
{
    let mut best: Option<BestMatch<'a>> = None;
    for (index, choice) in choices.iter().enumerate() {
        let score = scorer.score(query, choice);
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(BestMatch {
                choice: choice.as_str(),
                index,
                score,
            });
        }
        if score >= 100.0 {
            break;
        }
    }
    best
}

/// Token-order, token-set and partial-substring tolerant similarity
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio;

impl SimilarityScorer for WeightedRatio {
    fn score(&self, query: &str, choice: &str) -> f64 {
        weighted_ratio(&preprocess(query), &preprocess(choice))
    }
}

/// Lowercase, replace non-alphanumerics with spaces, trim
pub fn preprocess(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn weighted_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);

    let base = ratio(a, b);
    if len_ratio < 1.5 {
        let token = token_sort_ratio(a, b).max(token_set_ratio(a, b));
        return base.max(token * 0.95);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial = partial_ratio(a, b) * partial_scale;
    let partial_token = partial_token_ratio(a, b) * 0.95 * partial_scale;
    base.max(partial).max(partial_token)
}

/// Normalized Levenshtein similarity scaled to 0-100
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best `ratio` of the shorter string against same-length windows of the longer.
///
/// Windows hanging off either end of the longer string are scored as well, so a
/// query that only overlaps a prefix or suffix still gets credit.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if shorter.is_empty() {
        return if longer.is_empty() { 100.0 } else { 0.0 };
    }

    let short: Vec<char> = shorter.chars().collect();
    let long: Vec<char> = longer.chars().collect();
    let (m, n) = (short.len(), long.len());
    if m == n {
        return ratio(shorter, longer);
    }

    let mut best: f64 = 0.0;
    let mut consider = |window: &[char]| {
        let window: String = window.iter().collect();
        best = best.max(ratio(shorter, &window));
        best >= 100.0
    };

    for start in 0..=(n - m) {
        if consider(&long[start..start + m]) {
            return 100.0;
        }
    }
    for k in 1..m {
        if consider(&long[..k]) || consider(&long[n - k..]) {
            return 100.0;
        }
    }
    best
}

/// `ratio` after sorting whitespace tokens
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Compares the shared tokens against each side's leftovers.
///
/// Returns 100 when one token set contains the other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    let intersection: Vec<&str> = set_a.intersection(&set_b).copied().collect();
    let diff_ab: Vec<&str> = set_a.difference(&set_b).copied().collect();
    let diff_ba: Vec<&str> = set_b.difference(&set_a).copied().collect();

    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let combined_ab = join_nonempty(&sect, &diff_ab.join(" "));
    let combined_ba = join_nonempty(&sect, &diff_ba.join(" "));

    let mut best = ratio(&combined_ab, &combined_ba);
    if !sect.is_empty() {
        best = best
            .max(ratio(&sect, &combined_ab))
            .max(ratio(&sect, &combined_ba));
    }
    best
}

/// Partial ratio over token-sorted strings; 100 when any token is shared
pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    if set_a.intersection(&set_b).next().is_some() {
        return 100.0;
    }

    let joined_a = set_a.iter().copied().collect::<Vec<_>>().join(" ");
    let joined_b = set_b.iter().copied().collect::<Vec<_>>().join(" ");
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b)).max(partial_ratio(&joined_a, &joined_b))
}

fn token_set(text: &str) -> BTreeSet<&str> {
    text.split_whitespace().collect()
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join_nonempty(left: &str, right: &str) -> String {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right.to_string(),
        (_, true) => left.to_string(),
        _ => format!("{} {}", left, right),
    }
}
