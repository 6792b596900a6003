//! Outcome log and final report of a curation pass.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diversity::{DiversityReport, IndexStats, StopCondition};
use crate::quality::RejectReason;
use crate::record::{word_count, Record, RecordId};

/// Decision taken for one candidate. Produced once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FilterOutcome {
    Kept,
    Rejected {
        reasons: Vec<RejectReason>,
        /// Earlier record a duplicate matched.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matched_id: Option<RecordId>,
    },
}

impl FilterOutcome {
    /// Creates a rejection without a matched record.
    pub fn rejected(reasons: Vec<RejectReason>) -> Self {
        FilterOutcome::Rejected {
            reasons,
            matched_id: None,
        }
    }

    /// Creates a duplicate rejection pointing at the earlier record.
    pub fn duplicate(reason: RejectReason, matched_id: RecordId) -> Self {
        FilterOutcome::Rejected {
            reasons: vec![reason],
            matched_id: Some(matched_id),
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self, FilterOutcome::Kept)
    }

    /// Rejection reasons; empty for kept records.
    pub fn reasons(&self) -> &[RejectReason] {
        match self {
            FilterOutcome::Kept => &[],
            FilterOutcome::Rejected { reasons, .. } => reasons,
        }
    }

    pub fn matched_id(&self) -> Option<&RecordId> {
        match self {
            FilterOutcome::Kept => None,
            FilterOutcome::Rejected { matched_id, .. } => matched_id.as_ref(),
        }
    }
}

/// One line of the outcome log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub id: RecordId,
    /// Position in the candidate stream.
    pub sequence: usize,
    #[serde(flatten)]
    pub outcome: FilterOutcome,
    /// Set when the quality checks ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// Counters for a curation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Candidates seen.
    pub total: usize,
    /// Candidates accepted by filtering.
    pub kept: usize,
    pub rejected: usize,
    /// Occurrences of each reason; a record may count under several.
    pub by_reason: BTreeMap<RejectReason, usize>,
    /// Exact and near duplicates.
    pub duplicates: usize,
    pub removed_by_rebalance: usize,
    /// Records in the final accepted set.
    pub final_count: usize,
}

impl FilterStats {
    pub(crate) fn record(&mut self, outcome: &FilterOutcome) {
        self.total += 1;
        match outcome {
            FilterOutcome::Kept => self.kept += 1,
            FilterOutcome::Rejected { reasons, .. } => {
                self.rejected += 1;
                if reasons.iter().any(RejectReason::is_duplicate) {
                    self.duplicates += 1;
                }
                for reason in reasons {
                    *self.by_reason.entry(*reason).or_insert(0) += 1;
                }
            }
        }
    }

    /// Share of candidates that survived filtering.
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.kept as f64 / self.total as f64
    }
}

/// What the rebalancer did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSummary {
    pub passes: usize,
    pub stop: StopCondition,
    /// Removed ids, in removal order.
    pub removed_ids: Vec<RecordId>,
}

/// Final report of a curation pass.
#[derive(Debug, Clone, Serialize)]
pub struct CurationReport {
    pub stats: FilterStats,
    /// Earlier record id -> ids rejected as its duplicates.
    pub duplicate_groups: BTreeMap<RecordId, Vec<RecordId>>,
    /// Distribution right after filtering.
    pub diversity_before: DiversityReport,
    /// Distribution of the final accepted set.
    pub diversity: DiversityReport,
    /// Absent when rebalancing is disabled.
    pub rebalance: Option<RebalanceSummary>,
    pub index: IndexStats,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl CurationReport {
    /// Returns a summary of the report as a formatted string.
    pub fn summary(&self) -> String {
        let stats = &self.stats;
        let mut out = format!(
            "Curation Summary:\n\
             - Candidates: {}\n\
             - Kept after filtering: {} ({:.1}%)\n\
             - Rejected: {} ({} duplicates)",
            stats.total,
            stats.kept,
            stats.pass_rate() * 100.0,
            stats.rejected,
            stats.duplicates,
        );

        for (reason, count) in &stats.by_reason {
            out.push_str(&format!("\n    {:<22} {:>6}", reason.as_str(), count));
        }

        if let Some(rebalance) = &self.rebalance {
            out.push_str(&format!(
                "\n- Rebalancing: {} removed in {} passes ({})",
                stats.removed_by_rebalance, rebalance.passes, rebalance.stop
            ));
        }

        out.push_str(&format!(
            "\n- Final corpus: {}\n- Entropy: {:.3} -> {:.3}",
            stats.final_count, self.diversity_before.entropy, self.diversity.entropy
        ));

        if !self.recommendations.is_empty() {
            out.push_str("\n- Recommendations:");
            for recommendation in &self.recommendations {
                out.push_str(&format!("\n    * {}", recommendation));
            }
        }

        out
    }
}

/// Minimum, maximum and mean of a measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LengthStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl LengthStats {
    fn from_values(values: impl Iterator<Item = usize>) -> Self {
        let mut stats = LengthStats {
            min: usize::MAX,
            max: 0,
            mean: 0.0,
        };
        let mut sum = 0usize;
        let mut count = 0usize;

        for value in values {
            stats.min = stats.min.min(value);
            stats.max = stats.max.max(value);
            sum += value;
            count += 1;
        }

        if count == 0 {
            return LengthStats::default();
        }
        stats.mean = sum as f64 / count as f64;
        stats
    }
}

/// Basic length statistics of a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStats {
    pub records: usize,
    /// Question length in characters.
    pub question_length: LengthStats,
    /// Answer length in characters.
    pub answer_length: LengthStats,
    pub answer_words: LengthStats,
    /// Producer-assigned `qa_type` counts; untyped records count as "unknown".
    pub qa_types: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn from_records(records: &[Record]) -> Self {
        let mut qa_types: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            let qa_type = match record.metadata.qa_type() {
                "" => "unknown",
                qa_type => qa_type,
            };
            *qa_types.entry(qa_type.to_string()).or_insert(0) += 1;
        }

        Self {
            records: records.len(),
            question_length: LengthStats::from_values(
                records.iter().map(|r| r.question.chars().count()),
            ),
            answer_length: LengthStats::from_values(records.iter().map(|r| r.answer.chars().count())),
            answer_words: LengthStats::from_values(records.iter().map(|r| word_count(&r.answer))),
            qa_types,
        }
    }

    /// Returns a summary of the statistics as a formatted string.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Dataset Statistics:\n\
             - Records: {}\n\
             - Question length: min {}, max {}, avg {:.1}\n\
             - Answer length: min {}, max {}, avg {:.1}\n\
             - Answer words: min {}, max {}, avg {:.1}\n\
             - QA types:",
            self.records,
            self.question_length.min,
            self.question_length.max,
            self.question_length.mean,
            self.answer_length.min,
            self.answer_length.max,
            self.answer_length.mean,
            self.answer_words.min,
            self.answer_words.max,
            self.answer_words.mean,
        );

        let mut ordered: Vec<(&String, &usize)> = self.qa_types.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (qa_type, count) in ordered {
            out.push_str(&format!("\n    {:<20} {:>6}", qa_type, count));
        }

        out
    }
}
