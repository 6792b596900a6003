//! Pattern distribution analysis.
//!
//! Provides entropy and inequality measures over a pattern histogram and
//! the [`DiversityAnalyzer`], which turns an accepted set into a
//! [`DiversityReport`] with over/under-represented patterns and textual
//! recommendations.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::pipeline::config::{ConfigError, DiversityConfig};
use crate::record::{CuratedRecord, Record};

use super::patterns::PatternClassifier;

/// Calculates Shannon entropy of a distribution, in bits.
///
/// Zero counts are ignored. An empty distribution has entropy 0.
pub fn shannon_entropy(distribution: &BTreeMap<String, usize>) -> f64 {
    let total: usize = distribution.values().sum();
    if total == 0 {
        return 0.0;
    }

    let total_f = total as f64;

    distribution
        .values()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total_f;
            -p * p.log2()
        })
        .sum()
}

/// Calculates entropy normalized by `log2(k)`, k = patterns with a
/// non-zero count.
///
/// Edge cases: no records gives 0.0, a single pattern gives 1.0 (the report
/// flags the low pattern count separately) and equal counts give exactly
/// 1.0. The result is always in [0, 1].
pub fn normalized_entropy(distribution: &BTreeMap<String, usize>) -> f64 {
    let counts: Vec<usize> = distribution.values().copied().filter(|&c| c > 0).collect();

    match counts.len() {
        0 => 0.0,
        1 => 1.0,
        k => {
            if counts.iter().all(|&c| c == counts[0]) {
                return 1.0;
            }
            (shannon_entropy(distribution) / (k as f64).log2()).clamp(0.0, 1.0)
        }
    }
}

/// Calculates the Gini coefficient of a distribution.
///
/// 0 means every pattern has the same count; values approach 1 as one
/// pattern takes everything.
pub fn gini_coefficient(distribution: &BTreeMap<String, usize>) -> f64 {
    if distribution.is_empty() {
        return 0.0;
    }

    let mut values: Vec<f64> = distribution.values().map(|&v| v as f64).collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len() as f64;
    let total: f64 = values.iter().sum();

    if total == 0.0 {
        return 0.0;
    }

    let gini_sum: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &value)| (2.0 * (i as f64 + 1.0) - n - 1.0) * value)
        .sum();

    (gini_sum / (n * total)).clamp(0.0, 1.0)
}

/// Returns true if `distinct` patterns can all sit at or below
/// `max_ratio` at once.
///
/// The smallest achievable maximum share is `1 / distinct`, so a set with
/// fewer than `1 / max_ratio` patterns can never be balanced by removal.
pub fn balance_feasible(distinct: usize, max_ratio: f64) -> bool {
    distinct == 0 || 1.0 / distinct as f64 <= max_ratio
}

/// Smallest number of distinct patterns that can satisfy `max_ratio`.
///
/// Returns `usize::MAX` for a non-positive ratio.
pub fn min_patterns_for_ratio(max_ratio: f64) -> usize {
    if max_ratio <= 0.0 {
        return usize::MAX;
    }
    let mut needed = (1.0 / max_ratio).floor().max(1.0) as usize;
    while !balance_feasible(needed, max_ratio) {
        needed += 1;
    }
    needed
}

/// Distribution of question patterns over a set of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityReport {
    /// Records analyzed.
    pub total: usize,
    pub pattern_counts: BTreeMap<String, usize>,
    pub pattern_ratios: BTreeMap<String, f64>,
    pub distinct_patterns: usize,
    /// Normalized Shannon entropy in [0, 1].
    pub entropy: f64,
    pub gini: f64,
    /// Fewer distinct patterns than the configured minimum.
    pub low_diversity: bool,
    /// Patterns above the maximum ratio, with their ratio.
    pub over_represented: BTreeMap<String, f64>,
    /// Whether removals alone can bring every pattern under the maximum
    /// ratio, given the patterns present.
    pub balance_feasible: bool,
    /// Expected patterns below the floor ratio, with their ratio.
    pub under_represented: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
}

impl DiversityReport {
    /// Returns true if no pattern exceeds the maximum ratio.
    pub fn is_balanced(&self) -> bool {
        self.over_represented.is_empty()
    }

    /// Returns a summary of the report as a formatted string.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Diversity Report:\n\
             - Records: {}\n\
             - Distinct patterns: {}{}\n\
             - Entropy: {:.3}\n\
             - Gini: {:.3}\n\
             - Pattern distribution:",
            self.total,
            self.distinct_patterns,
            if self.low_diversity { " (low)" } else { "" },
            self.entropy,
            self.gini,
        );

        let mut ordered: Vec<(&String, &usize)> = self.pattern_counts.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (pattern, count) in ordered {
            let ratio = self.pattern_ratios.get(pattern).copied().unwrap_or(0.0);
            let marker = if self.over_represented.contains_key(pattern) {
                " !"
            } else {
                ""
            };
            out.push_str(&format!(
                "\n    {:<14} {:>6} ({:>5.1}%){}",
                pattern,
                count,
                ratio * 100.0,
                marker
            ));
        }

        if !self.recommendations.is_empty() {
            out.push_str("\n- Recommendations:");
            for recommendation in &self.recommendations {
                out.push_str(&format!("\n    * {}", recommendation));
            }
        }

        out
    }
}

/// Computes [`DiversityReport`]s.
#[derive(Debug, Clone)]
pub struct DiversityAnalyzer {
    max_pattern_ratio: f64,
    under_represented_floor: f64,
    expected_patterns: Vec<String>,
    min_distinct_patterns: usize,
    classifier: PatternClassifier,
}

impl Default for DiversityAnalyzer {
    fn default() -> Self {
        let config = DiversityConfig::default();
        Self {
            max_pattern_ratio: config.max_pattern_ratio,
            under_represented_floor: config.under_represented_floor,
            expected_patterns: config.expected_patterns,
            min_distinct_patterns: config.min_distinct_patterns,
            classifier: PatternClassifier::builtin(),
        }
    }
}

impl DiversityAnalyzer {
    /// Creates an analyzer with the default thresholds and taxonomy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an analyzer from a diversity configuration section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a custom pattern rule does not compile.
    pub fn from_config(config: &DiversityConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_pattern_ratio: config.max_pattern_ratio,
            under_represented_floor: config.under_represented_floor,
            expected_patterns: config.expected_patterns.clone(),
            min_distinct_patterns: config.min_distinct_patterns,
            classifier: PatternClassifier::from_config(&config.pattern_rules)?,
        })
    }

    /// Sets the maximum pattern ratio.
    pub fn with_max_pattern_ratio(mut self, ratio: f64) -> Self {
        self.max_pattern_ratio = ratio;
        self
    }

    /// Returns the classifier used for raw records.
    pub fn classifier(&self) -> &PatternClassifier {
        &self.classifier
    }

    pub fn max_pattern_ratio(&self) -> f64 {
        self.max_pattern_ratio
    }

    /// Analyzes an accepted set using the pattern stored on each record.
    pub fn analyze(&self, accepted: &[CuratedRecord]) -> DiversityReport {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in accepted {
            *counts.entry(record.pattern.clone()).or_insert(0) += 1;
        }
        self.analyze_counts(&counts)
    }

    /// Analyzes raw records, classifying each distinct question once.
    pub fn analyze_records(&self, records: &[Record]) -> DiversityReport {
        let mut memo: HashMap<&str, &str> = HashMap::new();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();

        for record in records {
            let pattern = *memo
                .entry(record.question.as_str())
                .or_insert_with(|| self.classifier.classify(&record.question));
            *counts.entry(pattern.to_string()).or_insert(0) += 1;
        }

        self.analyze_counts(&counts)
    }

    /// Builds a report from a pattern histogram.
    pub fn analyze_counts(&self, counts: &BTreeMap<String, usize>) -> DiversityReport {
        let counts: BTreeMap<String, usize> = counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(pattern, &count)| (pattern.clone(), count))
            .collect();
        let total: usize = counts.values().sum();

        let pattern_ratios: BTreeMap<String, f64> = counts
            .iter()
            .map(|(pattern, &count)| (pattern.clone(), count as f64 / total as f64))
            .collect();

        let over_represented: BTreeMap<String, f64> = pattern_ratios
            .iter()
            .filter(|(_, &ratio)| ratio > self.max_pattern_ratio)
            .map(|(pattern, &ratio)| (pattern.clone(), ratio))
            .collect();

        let under_represented: BTreeMap<String, f64> = if total == 0 {
            BTreeMap::new()
        } else {
            self.expected_patterns
                .iter()
                .map(|pattern| {
                    let ratio = pattern_ratios.get(pattern).copied().unwrap_or(0.0);
                    (pattern.clone(), ratio)
                })
                .filter(|(_, ratio)| *ratio < self.under_represented_floor)
                .collect()
        };

        let distinct_patterns = counts.len();
        let low_diversity = distinct_patterns < self.min_distinct_patterns;
        let feasible = balance_feasible(distinct_patterns, self.max_pattern_ratio);

        let mut recommendations = Vec::new();
        if total > 0 {
            let mut over: Vec<(&String, &f64)> = over_represented.iter().collect();
            over.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (pattern, ratio) in over {
                recommendations.push(format!(
                    "Reduce '{}' questions from {:.1}% to under {:.1}%",
                    pattern,
                    ratio * 100.0,
                    self.max_pattern_ratio * 100.0
                ));
            }
            if !feasible {
                recommendations.push(format!(
                    "Only {} distinct pattern(s) present; a {:.1}% cap needs at least {}, add questions of other patterns",
                    distinct_patterns,
                    self.max_pattern_ratio * 100.0,
                    min_patterns_for_ratio(self.max_pattern_ratio)
                ));
            }
            for (pattern, ratio) in &under_represented {
                recommendations.push(format!(
                    "Add more '{}' questions (currently {:.1}%)",
                    pattern,
                    ratio * 100.0
                ));
            }
            if low_diversity {
                recommendations.push(format!(
                    "Only {} distinct question pattern(s); aim for at least {}",
                    distinct_patterns, self.min_distinct_patterns
                ));
            }
        }

        DiversityReport {
            total,
            entropy: normalized_entropy(&counts),
            gini: gini_coefficient(&counts),
            pattern_counts: counts,
            pattern_ratios,
            distinct_patterns,
            low_diversity,
            over_represented,
            balance_feasible: feasible,
            under_represented,
            recommendations,
        }
    }
}
