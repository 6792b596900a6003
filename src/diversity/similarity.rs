//! Text similarity functions for duplicate detection.
//!
//! All functions operate on already normalized text and return a value in
//! [0, 1], symmetric in their arguments. Both metrics are bounded above by
//! `min(size_a, size_b) / max(size_a, size_b)` (characters for Levenshtein,
//! distinct tokens for Jaccard), which the index uses to restrict candidates
//! without losing matches.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Similarity function applied to normalized text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// `1 - edit_distance / max_len` over characters.
    #[default]
    Levenshtein,
    /// Jaccard index of the distinct whitespace tokens.
    TokenJaccard,
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimilarityMetric::Levenshtein => "levenshtein",
            SimilarityMetric::TokenJaccard => "token_jaccard",
        };
        write!(f, "{}", name)
    }
}

/// Edit distance between two character sequences.
pub fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    bounded_levenshtein(a, b, usize::MAX).unwrap_or(usize::MAX)
}

/// Edit distance, or `None` as soon as it is known to exceed `limit`.
fn bounded_levenshtein(a: &[char], b: &[char], limit: usize) -> Option<usize> {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if long.len() - short.len() > limit {
        return None;
    }
    if short.is_empty() {
        return Some(long.len());
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
            row_min = row_min.min(curr[j + 1]);
        }

        // Row minima never decrease, so the final distance is at least this.
        if row_min > limit {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[short.len()];
    (distance <= limit).then_some(distance)
}

/// Levenshtein ratio `1 - d / max_len`. Two empty strings are identical.
pub fn levenshtein_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_from_chars(&a, &b)
}

fn ratio_from_chars(a: &[char], b: &[char]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

/// Jaccard index of the distinct whitespace tokens. Two empty texts are
/// identical.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let a: BTreeSet<&str> = a.split_whitespace().collect();
    let b: BTreeSet<&str> = b.split_whitespace().collect();
    jaccard(&a, &b)
}

fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Similarity of two normalized texts under the given metric.
pub fn similarity(metric: SimilarityMetric, a: &str, b: &str) -> f64 {
    match metric {
        SimilarityMetric::Levenshtein => levenshtein_ratio(a, b),
        SimilarityMetric::TokenJaccard => token_jaccard(a, b),
    }
}

/// Inclusive range of sizes that can reach `threshold` against `size`.
///
/// Any text whose size lies outside the window has similarity strictly
/// below the threshold under both metrics.
pub fn size_window(size: usize, threshold: f64) -> (usize, usize) {
    if threshold <= 0.0 {
        return (0, usize::MAX);
    }
    let lower = (threshold * size as f64).floor() as usize;
    let upper = (size as f64 / threshold).ceil();
    let upper = if upper >= usize::MAX as f64 {
        usize::MAX
    } else {
        upper as usize
    };
    (lower, upper)
}

/// Precomputed views of one normalized text.
#[derive(Debug, Clone)]
pub struct TextProfile {
    chars: Vec<char>,
    tokens: BTreeSet<String>,
    histogram: HashMap<char, usize>,
}

impl TextProfile {
    /// Builds the profile of a normalized text.
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let tokens = text.split_whitespace().map(str::to_string).collect();
        let mut histogram = HashMap::new();
        for ch in &chars {
            *histogram.entry(*ch).or_insert(0) += 1;
        }

        Self {
            chars,
            tokens,
            histogram,
        }
    }

    /// Size used for candidate bucketing under `metric`.
    pub fn size(&self, metric: SimilarityMetric) -> usize {
        match metric {
            SimilarityMetric::Levenshtein => self.chars.len(),
            SimilarityMetric::TokenJaccard => self.tokens.len(),
        }
    }

    /// Lower bound on the edit distance to `other` from character counts.
    ///
    /// Every edit operation removes at most one surplus character from each
    /// side, so the distance is at least the larger of the two surpluses.
    pub fn edit_distance_bound(&self, other: &TextProfile) -> usize {
        let surplus = |from: &HashMap<char, usize>, to: &HashMap<char, usize>| -> usize {
            from.iter()
                .map(|(ch, count)| count.saturating_sub(to.get(ch).copied().unwrap_or(0)))
                .sum()
        };
        surplus(&self.histogram, &other.histogram).max(surplus(&other.histogram, &self.histogram))
    }

    /// Similarity to `other` if it may reach `threshold`, otherwise `None`.
    ///
    /// Returns `Some` exactly when the similarity is at least `threshold`;
    /// the cheap bounds only skip work that cannot change the answer.
    pub fn similarity_at_least(
        &self,
        other: &TextProfile,
        metric: SimilarityMetric,
        threshold: f64,
    ) -> Option<f64> {
        let score = match metric {
            SimilarityMetric::Levenshtein => {
                let max_len = self.chars.len().max(other.chars.len());
                if max_len == 0 {
                    1.0
                } else {
                    // Rounded up: the final comparison below decides.
                    let limit = ((1.0 - threshold) * max_len as f64).ceil() as usize;
                    if self.edit_distance_bound(other) > limit {
                        return None;
                    }
                    let distance = bounded_levenshtein(&self.chars, &other.chars, limit)?;
                    1.0 - distance as f64 / max_len as f64
                }
            }
            SimilarityMetric::TokenJaccard => jaccard(&self.tokens, &other.tokens),
        };

        (score >= threshold).then_some(score)
    }

    /// Similarity to `other` without pruning.
    pub fn similarity(&self, other: &TextProfile, metric: SimilarityMetric) -> f64 {
        match metric {
            SimilarityMetric::Levenshtein => ratio_from_chars(&self.chars, &other.chars),
            SimilarityMetric::TokenJaccard => jaccard(&self.tokens, &other.tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance_known_values() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(levenshtein_distance(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(levenshtein_distance(&chars(""), &chars("abc")), 3);
        assert_eq!(levenshtein_distance(&chars("śani"), &chars("sani")), 1);
        assert_eq!(levenshtein_distance(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn test_levenshtein_ratio() {
        assert_eq!(levenshtein_ratio("", ""), 1.0);
        assert_eq!(levenshtein_ratio("abc", ""), 0.0);
        assert!((levenshtein_ratio("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_token_jaccard() {
        assert_eq!(token_jaccard("", ""), 1.0);
        assert!((token_jaccard("a b c", "b c d") - 0.5).abs() < 1e-12);
        assert_eq!(token_jaccard("a a b", "b a"), 1.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [("what is lagna", "what is the lagna"), ("abc", "xyz"), ("", "a")];
        for metric in [SimilarityMetric::Levenshtein, SimilarityMetric::TokenJaccard] {
            for (a, b) in pairs {
                assert_eq!(similarity(metric, a, b), similarity(metric, b, a));
            }
        }
    }

    #[test]
    fn test_size_window_contains_all_reachable_sizes() {
        let threshold = 0.85;
        for size in 0..200usize {
            let (lower, upper) = size_window(size, threshold);
            for other in 0..300usize {
                let max = size.max(other);
                let bound = if max == 0 {
                    1.0
                } else {
                    size.min(other) as f64 / max as f64
                };
                if bound >= threshold {
                    assert!(
                        (lower..=upper).contains(&other),
                        "size {} other {} outside [{}, {}]",
                        size,
                        other,
                        lower,
                        upper
                    );
                }
            }
        }
    }

    #[test]
    fn test_edit_distance_bound_is_lower_bound() {
        let samples = ["what is lagna", "what is the lagna", "rahu ketu", "ketu rahu", ""];
        for a in samples {
            for b in samples {
                let pa = TextProfile::new(a);
                let pb = TextProfile::new(b);
                let ca: Vec<char> = a.chars().collect();
                let cb: Vec<char> = b.chars().collect();
                assert!(pa.edit_distance_bound(&pb) <= levenshtein_distance(&ca, &cb));
            }
        }
    }

    #[test]
    fn test_similarity_at_least_matches_unpruned() {
        let texts = [
            "what is the role of saturn in the seventh house saturn delays marriage",
            "what is the role of saturn in the 7th house saturn delays marriage",
            "what is the role of jupiter in the fifth house jupiter blesses children",
            "",
        ];
        for metric in [SimilarityMetric::Levenshtein, SimilarityMetric::TokenJaccard] {
            for a in texts {
                for b in texts {
                    let pa = TextProfile::new(a);
                    let pb = TextProfile::new(b);
                    let full = pa.similarity(&pb, metric);
                    let pruned = pa.similarity_at_least(&pb, metric, 0.85);
                    assert_eq!(pruned.is_some(), full >= 0.85, "{:?} {:?}", a, b);
                    if let Some(score) = pruned {
                        assert!((score - full).abs() < 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(
            serde_json::to_string(&SimilarityMetric::TokenJaccard).unwrap(),
            "\"token_jaccard\""
        );
        assert_eq!(SimilarityMetric::Levenshtein.to_string(), "levenshtein");
    }
}
