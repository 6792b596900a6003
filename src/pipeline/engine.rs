//! The curation engine.
//!
//! A pass runs in two stages:
//!
//! 1. **Filtering**: candidates are taken one at a time, cheapest checks
//!    first (schema, id collision, exact duplicate), then the quality
//!    evaluator, then the near-duplicate probe. Survivors enter the index
//!    and the working set in arrival order.
//! 2. **Balancing**: the accepted set is analyzed and, if enabled, the
//!    rebalancer trims over-represented patterns.
//!
//! The engine holds no state between passes; each call builds a fresh
//! index.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::diversity::{
    DiversityAnalyzer, IndexStats, PatternClassifier, Rebalancer, SimilarityIndex, StopCondition,
};
use crate::error::CurationError;
use crate::lexicon::Lexicon;
use crate::quality::{QualityEvaluator, RejectReason};
use crate::record::{normalize_text, CuratedRecord, Record, RecordId};

use super::config::CurationConfig;
use super::report::{CurationReport, FilterOutcome, FilterStats, OutcomeEntry, RebalanceSummary};

/// Result of the filtering stage.
#[derive(Debug, Clone)]
pub struct FilterPass {
    /// Accepted records in arrival order.
    pub accepted: Vec<CuratedRecord>,
    /// One entry per candidate, in arrival order.
    pub outcomes: Vec<OutcomeEntry>,
    /// Rejected candidates, untouched.
    pub rejected: Vec<Record>,
    pub duplicate_groups: BTreeMap<RecordId, Vec<RecordId>>,
    pub stats: FilterStats,
    pub index: IndexStats,
}

/// Everything produced by a full pass.
#[derive(Debug, Clone)]
pub struct CurationOutput {
    /// Final accepted set in original insertion order.
    pub accepted: Vec<CuratedRecord>,
    pub outcomes: Vec<OutcomeEntry>,
    pub rejected: Vec<Record>,
    /// Records accepted by filtering and then removed by the rebalancer.
    pub rebalanced_out: Vec<CuratedRecord>,
    pub report: CurationReport,
}

impl CurationOutput {
    /// The final records, without engine-computed fields.
    pub fn kept_records(&self) -> Vec<&Record> {
        self.accepted.iter().map(|r| &r.record).collect()
    }

    /// Rejected and rebalanced-out records, in that order.
    pub fn removed_records(&self) -> Vec<&Record> {
        self.rejected
            .iter()
            .chain(self.rebalanced_out.iter().map(|r| &r.record))
            .collect()
    }
}

/// Runs curation passes over candidate streams.
#[derive(Debug, Clone)]
pub struct CurationEngine {
    config: CurationConfig,
    lexicon: Lexicon,
    evaluator: QualityEvaluator,
    classifier: PatternClassifier,
    analyzer: DiversityAnalyzer,
    rebalancer: Rebalancer,
}

impl CurationEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns `CurationError::Config` if the configuration is invalid.
    pub fn new(config: CurationConfig, lexicon: Lexicon) -> Result<Self, CurationError> {
        config.validate()?;

        let analyzer = DiversityAnalyzer::from_config(&config.diversity)?;
        Ok(Self {
            evaluator: QualityEvaluator::from_config(&config.quality),
            classifier: analyzer.classifier().clone(),
            rebalancer: Rebalancer::from_config(&config.diversity),
            analyzer,
            lexicon,
            config,
        })
    }

    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn analyzer(&self) -> &DiversityAnalyzer {
        &self.analyzer
    }

    /// Runs filtering, analysis and rebalancing over the candidates.
    ///
    /// # Errors
    ///
    /// Returns `CurationError::Config` when `min_corpus_floor` exceeds the
    /// number of candidates. Per-record problems never fail the pass.
    pub fn run(&self, candidates: Vec<Record>) -> Result<CurationOutput, CurationError> {
        self.config.validate_for_candidates(candidates.len())?;

        let FilterPass {
            accepted,
            outcomes,
            rejected,
            duplicate_groups,
            mut stats,
            index,
        } = self.filter(candidates);

        let diversity_before = self.analyzer.analyze(&accepted);

        let (accepted, rebalanced_out, rebalance, diversity, residual) =
            if self.config.diversity.rebalance {
                let outcome = self
                    .rebalancer
                    .rebalance(accepted, &diversity_before, &self.analyzer);

                match outcome.stop {
                    StopCondition::Balanced => info!(
                        passes = outcome.passes,
                        removed = outcome.removed.len(),
                        "Rebalancing converged"
                    ),
                    stop => warn!(
                        passes = outcome.passes,
                        removed = outcome.removed.len(),
                        stop = %stop,
                        "Rebalancing stopped before balance"
                    ),
                }

                let summary = RebalanceSummary {
                    passes: outcome.passes,
                    stop: outcome.stop,
                    removed_ids: outcome.removals.iter().map(|r| r.id.clone()).collect(),
                };
                (
                    outcome.accepted,
                    outcome.removed,
                    Some(summary),
                    outcome.report,
                    outcome.recommendations,
                )
            } else {
                let diversity = diversity_before.clone();
                (accepted, Vec::new(), None, diversity, Vec::new())
            };

        stats.removed_by_rebalance = rebalanced_out.len();
        stats.final_count = accepted.len();

        let mut recommendations = residual;
        recommendations.extend(diversity.recommendations.iter().cloned());

        info!(
            candidates = stats.total,
            kept = stats.kept,
            rejected = stats.rejected,
            rebalanced_out = stats.removed_by_rebalance,
            final_count = stats.final_count,
            entropy = diversity.entropy,
            "Curation pass complete"
        );

        let report = CurationReport {
            stats,
            duplicate_groups,
            diversity_before,
            diversity,
            rebalance,
            index,
            recommendations,
            generated_at: Utc::now(),
        };

        Ok(CurationOutput {
            accepted,
            outcomes,
            rejected,
            rebalanced_out,
            report,
        })
    }

    /// Runs the filtering stage only.
    pub fn filter(&self, candidates: Vec<Record>) -> FilterPass {
        let mut index = SimilarityIndex::from_config(&self.config.similarity);
        let mut accepted = Vec::new();
        let mut outcomes = Vec::with_capacity(candidates.len());
        let mut rejected = Vec::new();
        let mut duplicate_groups: BTreeMap<RecordId, Vec<RecordId>> = BTreeMap::new();
        let mut stats = FilterStats::default();

        for (sequence, record) in candidates.into_iter().enumerate() {
            let (outcome, quality_score, curated) = self.screen(&mut index, record, sequence);

            stats.record(&outcome);
            let id = match &curated {
                Ok(kept) => kept.id().clone(),
                Err(record) => record.id.clone(),
            };

            if let FilterOutcome::Rejected {
                reasons,
                matched_id,
            } = &outcome
            {
                debug!(id = %id, sequence, reasons = ?reasons, matched = ?matched_id, "Candidate rejected");
                if let Some(matched) = matched_id {
                    duplicate_groups
                        .entry(matched.clone())
                        .or_default()
                        .push(id.clone());
                }
            }

            match curated {
                Ok(kept) => accepted.push(kept),
                Err(record) => rejected.push(record),
            }

            outcomes.push(OutcomeEntry {
                id,
                sequence,
                outcome,
                quality_score,
            });
        }

        info!(
            total = stats.total,
            kept = stats.kept,
            rejected = stats.rejected,
            duplicates = stats.duplicates,
            "Filtering complete"
        );

        FilterPass {
            accepted,
            outcomes,
            rejected,
            duplicate_groups,
            stats,
            index: index.stats(),
        }
    }

    /// Decides one candidate. Returns the outcome, the quality score when
    /// the checks ran, and either the accepted record or the rejected one.
    fn screen(
        &self,
        index: &mut SimilarityIndex,
        record: Record,
        sequence: usize,
    ) -> (FilterOutcome, Option<f64>, Result<CuratedRecord, Record>) {
        if let Some(reason) = self.evaluator.check_schema(&record) {
            return (FilterOutcome::rejected(vec![reason]), None, Err(record));
        }

        // Ids are unique across the accepted set; collisions are not merged.
        if index.contains_id(&record.id) {
            return (
                FilterOutcome::rejected(vec![RejectReason::SchemaInvalid]),
                None,
                Err(record),
            );
        }

        let normalized_question = normalize_text(&record.question);
        let normalized_answer = normalize_text(&record.answer);

        if let Some(matched) = index.find_exact(&normalized_question, &normalized_answer) {
            let outcome = FilterOutcome::duplicate(RejectReason::DuplicateExact, matched.clone());
            return (outcome, None, Err(record));
        }

        let evaluation = self.evaluator.evaluate(&record, &self.lexicon);
        if !evaluation.passed() {
            return (
                FilterOutcome::rejected(evaluation.reasons),
                Some(evaluation.quality_score),
                Err(record),
            );
        }

        let offer = index.offer_normalized(&record.id, &normalized_question, &normalized_answer);
        if !offer.accepted {
            let outcome = match (offer.reason, offer.matched_id) {
                (Some(reason), Some(matched)) => FilterOutcome::duplicate(reason, matched),
                (reason, _) => {
                    FilterOutcome::rejected(vec![reason.unwrap_or(RejectReason::DuplicateNear)])
                }
            };
            return (outcome, Some(evaluation.quality_score), Err(record));
        }

        let pattern = self.classifier.classify(&record.question).to_string();
        let curated = CuratedRecord {
            record,
            pattern,
            quality_score: evaluation.quality_score,
            normalized_question,
            normalized_answer,
            sequence,
        };
        (FilterOutcome::Kept, Some(evaluation.quality_score), Ok(curated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: CurationConfig) -> CurationEngine {
        CurationEngine::new(config, Lexicon::builtin()).unwrap()
    }

    fn good(id: &str, planet: &str, house: &str) -> Record {
        Record::new(
            id,
            format!("What is the effect of {} in the {} house?", planet, house),
            format!(
                "{} placed in the {} bhāva shapes the affairs of that house according \
                 to its dignity, aspects received and the dasha running at the time.",
                planet, house
            ),
        )
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = CurationConfig::default().with_max_pattern_ratio(0.0);
        let result = CurationEngine::new(config, Lexicon::builtin());
        assert!(matches!(result, Err(CurationError::Config(_))));
    }

    #[test]
    fn test_floor_above_candidate_count_is_config_error() {
        let engine = engine(CurationConfig::default().with_min_corpus_floor(5));
        let result = engine.run(vec![good("a", "Saturn", "seventh")]);
        assert!(matches!(result, Err(CurationError::Config(_))));
    }

    #[test]
    fn test_id_collision_is_schema_invalid() {
        let engine = engine(CurationConfig::default());
        let pass = engine.filter(vec![
            good("same", "Saturn", "seventh"),
            good("same", "Jupiter", "fifth"),
        ]);

        assert_eq!(pass.accepted.len(), 1);
        assert_eq!(
            pass.outcomes[1].outcome,
            FilterOutcome::rejected(vec![RejectReason::SchemaInvalid])
        );
        assert_eq!(pass.rejected[0].question, "What is the effect of Jupiter in the fifth house?");
    }

    #[test]
    fn test_exact_duplicate_skips_quality_checks() {
        let engine = engine(CurationConfig::default());
        let pass = engine.filter(vec![
            good("a", "Saturn", "seventh"),
            good("b", "Saturn", "seventh"),
        ]);

        let second = &pass.outcomes[1];
        assert_eq!(second.outcome.reasons(), &[RejectReason::DuplicateExact]);
        assert_eq!(second.outcome.matched_id(), Some(&RecordId::new("a")));
        assert_eq!(second.quality_score, None);
        assert_eq!(pass.duplicate_groups[&RecordId::new("a")], vec![RecordId::new("b")]);
    }

    #[test]
    fn test_accepted_records_carry_pattern_and_score() {
        let engine = engine(CurationConfig::default());
        let pass = engine.filter(vec![good("a", "Saturn", "seventh")]);

        let kept = &pass.accepted[0];
        assert_eq!(kept.pattern, "what_is");
        assert!(kept.quality_score > 0.0);
        assert_eq!(kept.sequence, 0);
        assert_eq!(kept.normalized_question, "what is the effect of saturn in the seventh house");
    }

    #[test]
    fn test_run_without_rebalance() {
        let engine = engine(CurationConfig::default().with_rebalance(false));
        let output = engine
            .run(vec![good("a", "Saturn", "seventh"), good("b", "Mars", "tenth")])
            .unwrap();

        assert!(output.report.rebalance.is_none());
        assert_eq!(output.report.stats.final_count, output.accepted.len());
        assert_eq!(output.report.diversity, output.report.diversity_before);
    }

    #[test]
    fn test_empty_input() {
        let engine = engine(CurationConfig::default());
        let output = engine.run(Vec::new()).unwrap();
        assert!(output.accepted.is_empty());
        assert_eq!(output.report.stats.total, 0);
        assert_eq!(output.report.diversity.entropy, 0.0);
        assert_eq!(
            output.report.rebalance.as_ref().map(|r| r.stop),
            Some(StopCondition::Balanced)
        );
    }
}
