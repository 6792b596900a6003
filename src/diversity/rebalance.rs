//! Greedy corpus rebalancing.
//!
//! Each pass removes exactly one record: the lowest-quality member of the
//! most over-represented pattern. Passes continue until no pattern exceeds
//! the maximum ratio, until one more removal would take the set below the
//! floor, or until the pass budget is spent. A set with too few distinct
//! patterns for the ratio is left untouched. Counts are updated
//! incrementally; the accepted set is re-analyzed once at the end.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::config::DiversityConfig;
use crate::record::{CuratedRecord, RecordId};

use super::metrics::{balance_feasible, DiversityAnalyzer, DiversityReport};

/// Why rebalancing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// No pattern exceeds the maximum ratio.
    Balanced,
    /// Too few distinct patterns for the maximum ratio; nothing was removed.
    Infeasible,
    /// Another removal would shrink the set below the floor.
    FloorReached,
    /// The configured number of removals was used up.
    PassBudgetExhausted,
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopCondition::Balanced => "balanced",
            StopCondition::Infeasible => "target infeasible",
            StopCondition::FloorReached => "floor reached",
            StopCondition::PassBudgetExhausted => "pass budget exhausted",
        };
        write!(f, "{}", name)
    }
}

/// One rebalancing removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedRecord {
    pub id: RecordId,
    pub pattern: String,
    pub quality_score: f64,
    /// 1-based pass number.
    pub pass: usize,
}

/// Result of a rebalancing run.
#[derive(Debug, Clone)]
pub struct RebalanceOutcome {
    /// Surviving records in their original insertion order.
    pub accepted: Vec<CuratedRecord>,
    /// Removed records, in removal order.
    pub removed: Vec<CuratedRecord>,
    pub removals: Vec<RemovedRecord>,
    pub passes: usize,
    pub stop: StopCondition,
    /// Analysis of `accepted`.
    pub report: DiversityReport,
    /// Residual imbalance notes; empty when balanced.
    pub recommendations: Vec<String>,
}

// Min-heap entry: lowest quality first, then the latest insertion.
type HeapEntry = Reverse<(OrderedFloat<f64>, Reverse<usize>)>;

/// Removes low-quality records from over-represented patterns.
#[derive(Debug, Clone)]
pub struct Rebalancer {
    max_pattern_ratio: f64,
    min_corpus_floor: usize,
    max_passes: usize,
}

impl Default for Rebalancer {
    fn default() -> Self {
        Self::from_config(&DiversityConfig::default())
    }
}

impl Rebalancer {
    /// Creates a rebalancer.
    ///
    /// # Arguments
    ///
    /// * `max_pattern_ratio` - Largest share any pattern may keep.
    /// * `min_corpus_floor` - Size the accepted set never drops below.
    /// * `max_passes` - Upper bound on removals.
    pub fn new(max_pattern_ratio: f64, min_corpus_floor: usize, max_passes: usize) -> Self {
        Self {
            max_pattern_ratio,
            min_corpus_floor,
            max_passes,
        }
    }

    /// Creates a rebalancer from a diversity configuration section.
    pub fn from_config(config: &DiversityConfig) -> Self {
        Self::new(
            config.max_pattern_ratio,
            config.min_corpus_floor,
            config.max_rebalance_passes,
        )
    }

    /// Rebalances an accepted set.
    ///
    /// `report` must describe `accepted`; a balanced report returns the set
    /// unchanged without further work.
    pub fn rebalance(
        &self,
        accepted: Vec<CuratedRecord>,
        report: &DiversityReport,
        analyzer: &DiversityAnalyzer,
    ) -> RebalanceOutcome {
        if report.is_balanced() {
            return RebalanceOutcome {
                report: report.clone(),
                accepted,
                removed: Vec::new(),
                removals: Vec::new(),
                passes: 0,
                stop: StopCondition::Balanced,
                recommendations: Vec::new(),
            };
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut heaps: HashMap<&str, BinaryHeap<HeapEntry>> = HashMap::new();
        for (position, record) in accepted.iter().enumerate() {
            *counts.entry(record.pattern.as_str()).or_insert(0) += 1;
            heaps
                .entry(record.pattern.as_str())
                .or_default()
                .push(Reverse((OrderedFloat(record.quality_score), Reverse(position))));
        }

        let mut removed_flags = vec![false; accepted.len()];
        let mut removed_order: Vec<usize> = Vec::new();
        let mut removals: Vec<RemovedRecord> = Vec::new();
        let mut total = accepted.len();
        let mut passes = 0;

        let stop = loop {
            let Some(pattern) = self.most_over_represented(&counts, total) else {
                break StopCondition::Balanced;
            };
            // While feasible the chosen pattern holds at least two records,
            // so this can only fire before the first removal.
            if !balance_feasible(counts.len(), self.max_pattern_ratio) {
                break StopCondition::Infeasible;
            }
            if total <= self.min_corpus_floor {
                break StopCondition::FloorReached;
            }
            if passes >= self.max_passes {
                break StopCondition::PassBudgetExhausted;
            }

            let Some(Reverse((quality, Reverse(position)))) =
                heaps.get_mut(pattern).and_then(BinaryHeap::pop)
            else {
                // Counts and heaps are built together; an empty heap means
                // the count is already zero.
                counts.remove(pattern);
                continue;
            };

            passes += 1;
            total -= 1;
            removed_flags[position] = true;
            removed_order.push(position);
            if let Some(count) = counts.get_mut(pattern) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(pattern);
                }
            }

            let record = &accepted[position];
            debug!(
                pass = passes,
                id = %record.id(),
                pattern = pattern,
                quality = quality.0,
                remaining = total,
                "Rebalance removal"
            );
            removals.push(RemovedRecord {
                id: record.id().clone(),
                pattern: pattern.to_string(),
                quality_score: quality.0,
                pass: passes,
            });
        };

        let mut slots: Vec<Option<CuratedRecord>> = accepted.into_iter().map(Some).collect();
        let removed: Vec<CuratedRecord> = removed_order
            .iter()
            .filter_map(|&position| slots[position].take())
            .collect();
        let accepted: Vec<CuratedRecord> = slots
            .into_iter()
            .zip(removed_flags)
            .filter_map(|(slot, was_removed)| if was_removed { None } else { slot })
            .collect();

        let report = analyzer.analyze(&accepted);
        let recommendations = residual_recommendations(&report, stop);

        RebalanceOutcome {
            accepted,
            removed,
            removals,
            passes,
            stop,
            report,
            recommendations,
        }
    }

    /// Pattern with the highest count above the ratio; ties go to the
    /// lexicographically smallest label.
    fn most_over_represented<'a>(&self, counts: &BTreeMap<&'a str, usize>, total: usize) -> Option<&'a str> {
        if total == 0 {
            return None;
        }

        let mut best: Option<(&'a str, usize)> = None;
        for (&pattern, &count) in counts {
            if count as f64 / total as f64 <= self.max_pattern_ratio {
                continue;
            }
            // Strictly greater keeps the first (smallest) label on ties.
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((pattern, count));
            }
        }
        best.map(|(pattern, _)| pattern)
    }
}

fn residual_recommendations(report: &DiversityReport, stop: StopCondition) -> Vec<String> {
    if stop == StopCondition::Balanced {
        return Vec::new();
    }

    let mut over: Vec<(&String, &f64)> = report.over_represented.iter().collect();
    over.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    over.into_iter()
        .map(|(pattern, ratio)| {
            format!("pattern '{}' still at {:.1}%, {}", pattern, ratio * 100.0, stop)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn curated(sequence: usize, pattern: &str, quality: f64) -> CuratedRecord {
        CuratedRecord {
            record: Record::new(format!("r{}", sequence), "q", "a"),
            pattern: pattern.to_string(),
            quality_score: quality,
            normalized_question: "q".to_string(),
            normalized_answer: "a".to_string(),
            sequence,
        }
    }

    fn corpus(groups: &[(&str, usize)]) -> Vec<CuratedRecord> {
        let mut records = Vec::new();
        for (pattern, count) in groups {
            for _ in 0..*count {
                let sequence = records.len();
                let quality = 0.1 + (sequence % 9) as f64 * 0.1;
                records.push(curated(sequence, pattern, quality));
            }
        }
        records
    }

    fn run(rebalancer: &Rebalancer, records: Vec<CuratedRecord>) -> RebalanceOutcome {
        let analyzer = DiversityAnalyzer::new().with_max_pattern_ratio(rebalancer.max_pattern_ratio);
        let report = analyzer.analyze(&records);
        rebalancer.rebalance(records, &report, &analyzer)
    }

    #[test]
    fn test_balanced_input_is_untouched() {
        let records = corpus(&[("a", 1), ("b", 1), ("c", 1), ("d", 1), ("e", 1), ("f", 1), ("g", 1)]);
        let outcome = run(&Rebalancer::new(0.15, 0, 100), records.clone());
        assert_eq!(outcome.stop, StopCondition::Balanced);
        assert_eq!(outcome.passes, 0);
        assert_eq!(outcome.accepted, records);
    }

    #[test]
    fn test_converges_with_minimum_removals() {
        let mut groups = vec![("big", 30)];
        let names = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9"];
        groups.extend(names.iter().map(|name| (*name, 10)));

        let outcome = run(&Rebalancer::new(0.15, 0, 1000), corpus(&groups));
        assert_eq!(outcome.stop, StopCondition::Balanced);
        // 15 / 105 <= 0.15 < 16 / 106
        assert_eq!(outcome.passes, 15);
        assert!(outcome.removals.iter().all(|r| r.pattern == "big"));
        assert_eq!(outcome.report.pattern_counts["big"], 15);
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_floor_reached() {
        let mut groups = vec![("what_is", 80)];
        let names = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9"];
        groups.extend(names.iter().map(|name| (*name, 5)));

        let outcome = run(&Rebalancer::new(0.15, 100, 10_000), corpus(&groups));

        assert_eq!(outcome.stop, StopCondition::FloorReached);
        assert_eq!(outcome.accepted.len(), 100);
        assert_eq!(outcome.passes, 25);
        assert!(outcome.removals.iter().all(|r| r.pattern == "what_is"));
        assert_eq!(
            outcome.recommendations[0],
            "pattern 'what_is' still at 55.0%, floor reached"
        );
    }

    #[test]
    fn test_too_few_patterns_is_infeasible() {
        let records = corpus(&[("what_is", 80), ("why", 5), ("how_does", 5), ("compare", 5), ("predict", 5)]);
        let outcome = run(&Rebalancer::new(0.15, 0, 10_000), records.clone());

        assert_eq!(outcome.stop, StopCondition::Infeasible);
        assert_eq!(outcome.passes, 0);
        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.accepted, records);
        assert!(!outcome.report.balance_feasible);
        assert_eq!(
            outcome.recommendations,
            vec!["pattern 'what_is' still at 80.0%, target infeasible".to_string()]
        );
    }

    #[test]
    fn test_single_pattern_is_never_emptied() {
        let records = corpus(&[("what_is", 12)]);
        let outcome = run(&Rebalancer::new(0.5, 0, 10_000), records);
        assert_eq!(outcome.stop, StopCondition::Infeasible);
        assert_eq!(outcome.accepted.len(), 12);
    }

    #[test]
    fn test_feasible_target_removes_the_minimum() {
        let records = corpus(&[("what_is", 80), ("why", 5), ("how_does", 5), ("compare", 5), ("predict", 5)]);
        let outcome = run(&Rebalancer::new(0.25, 0, 10_000), records);

        assert_eq!(outcome.stop, StopCondition::Balanced);
        // 6 / 26 <= 0.25 < 7 / 27
        assert_eq!(outcome.passes, 74);
        assert_eq!(outcome.accepted.len(), 26);
        assert_eq!(outcome.report.pattern_counts["what_is"], 6);
        assert_eq!(outcome.report.pattern_counts["why"], 5);
        assert!(outcome.report.is_balanced());
    }

    #[test]
    fn test_pass_budget_exhausted() {
        let records = corpus(&[("a", 20), ("b", 2), ("c", 2)]);
        let outcome = run(&Rebalancer::new(0.5, 0, 3), records);
        assert_eq!(outcome.stop, StopCondition::PassBudgetExhausted);
        assert_eq!(outcome.passes, 3);
        assert_eq!(outcome.accepted.len(), 21);
        assert!(outcome.recommendations[0].ends_with("pass budget exhausted"));
    }

    #[test]
    fn test_already_below_floor_stops_immediately() {
        let records = corpus(&[("a", 5), ("b", 1)]);
        let outcome = run(&Rebalancer::new(0.5, 10, 100), records);
        assert_eq!(outcome.stop, StopCondition::FloorReached);
        assert_eq!(outcome.passes, 0);
    }

    #[test]
    fn test_removes_lowest_quality_latest_on_ties() {
        let records = vec![
            curated(0, "a", 0.2),
            curated(1, "a", 0.9),
            curated(2, "a", 0.2),
            curated(3, "a", 0.5),
            curated(4, "b", 0.1),
            curated(5, "c", 0.1),
        ];
        // a: 4/6 > 0.5; one removal gives 3/5 > 0.5; two give 2/4 = 0.5
        let outcome = run(&Rebalancer::new(0.5, 0, 100), records);

        let removed: Vec<&str> = outcome.removals.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(removed, vec!["r2", "r0"]);
        assert_eq!(outcome.stop, StopCondition::Balanced);
    }

    #[test]
    fn test_tie_between_patterns_picks_smallest_label() {
        let records = vec![
            curated(0, "zeta", 0.5),
            curated(1, "zeta", 0.5),
            curated(2, "alpha", 0.5),
            curated(3, "alpha", 0.5),
            curated(4, "beta", 0.5),
        ];
        let outcome = run(&Rebalancer::new(0.35, 0, 1), records);
        assert_eq!(outcome.removals[0].pattern, "alpha");
    }

    #[test]
    fn test_output_keeps_insertion_order() {
        let records = corpus(&[("a", 6), ("b", 2), ("c", 2)]);
        let outcome = run(&Rebalancer::new(0.4, 0, 100), records);
        let sequences: Vec<usize> = outcome.accepted.iter().map(|r| r.sequence).collect();
        let mut sorted = sequences.clone();
        sorted.sort_unstable();
        assert_eq!(sequences, sorted);
        assert_eq!(outcome.accepted.len() + outcome.removed.len(), 10);
    }

    #[test]
    fn test_stop_condition_serde() {
        assert_eq!(
            serde_json::to_string(&StopCondition::PassBudgetExhausted).unwrap(),
            "\"pass_budget_exhausted\""
        );
        assert_eq!(StopCondition::Infeasible.to_string(), "target infeasible");
    }
}
