//! Per-record quality checks.
//!
//! This module decides whether a single candidate is fit for the corpus on
//! its own merits (length, topical relevance, self-repetition) and assigns
//! it a quality score used later by the rebalancer.

mod filter;
mod repetition;

pub use filter::{
    combine_score, Evaluation, QualityEvaluator, QualityEvaluatorBuilder, QualityMetrics,
    RejectReason,
};
pub use repetition::{
    ngram_repetition_ratio, sentence_repetition_ratio, split_sentences, RepetitionAnalyzer,
    RepetitionReport,
};
