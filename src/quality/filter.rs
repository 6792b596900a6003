//! Per-record quality evaluation.
//!
//! Checks run in a fixed order: schema, minimum lengths, relevance,
//! self-repetition. A schema failure stops evaluation; every other failing
//! check is collected so the outcome log lists all of them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lexicon::Lexicon;
use crate::pipeline::config::{QualityConfig, QualityWeights};
use crate::record::{word_count, Record};

use super::repetition::{RepetitionAnalyzer, RepetitionReport};

/// Default minimum question length in characters.
const DEFAULT_MIN_QUESTION_LENGTH: usize = 20;

/// Default minimum answer length in characters.
const DEFAULT_MIN_ANSWER_LENGTH: usize = 30;

/// Default minimum answer word count.
const DEFAULT_MIN_ANSWER_WORDS: usize = 10;

/// Default answer length at which the length component saturates.
const DEFAULT_LENGTH_CEILING: usize = 400;

/// Default term density at which the relevance component saturates.
const DEFAULT_DENSITY_CEILING: f64 = 0.15;

/// Reasons a candidate record is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Same normalized question and answer as an accepted record.
    DuplicateExact,
    /// Similarity to an accepted record at or above the threshold.
    DuplicateNear,
    /// Question shorter than the minimum length.
    TooShortQuestion,
    /// Answer shorter than the minimum length.
    TooShortAnswer,
    /// Answer has fewer words than the minimum.
    TooFewAnswerWords,
    /// Neither question nor answer mentions a lexicon term.
    OffTopic,
    /// Answer repeats its own sentences or phrases.
    SelfRepetitive,
    /// Blank id, question or answer, or an id already accepted.
    SchemaInvalid,
}

impl RejectReason {
    /// Returns the wire name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::DuplicateExact => "duplicate_exact",
            RejectReason::DuplicateNear => "duplicate_near",
            RejectReason::TooShortQuestion => "too_short_question",
            RejectReason::TooShortAnswer => "too_short_answer",
            RejectReason::TooFewAnswerWords => "too_few_answer_words",
            RejectReason::OffTopic => "off_topic",
            RejectReason::SelfRepetitive => "self_repetitive",
            RejectReason::SchemaInvalid => "schema_invalid",
        }
    }

    /// Returns true for the two duplicate reasons.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RejectReason::DuplicateExact | RejectReason::DuplicateNear)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements taken while evaluating a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub question_chars: usize,
    pub answer_chars: usize,
    pub answer_words: usize,
    /// Lexicon term occurrences in the answer.
    pub lexicon_hits: usize,
    /// `lexicon_hits / answer_words`.
    pub term_density: f64,
    pub sentence_repetition: f64,
    pub ngram_repetition: f64,
}

/// The result of evaluating one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Quality score in [0, 1].
    pub quality_score: f64,
    /// Rejection reasons in check order; empty when the record passed.
    pub reasons: Vec<RejectReason>,
    pub metrics: QualityMetrics,
}

impl Evaluation {
    /// Returns true if no check failed.
    pub fn passed(&self) -> bool {
        self.reasons.is_empty()
    }

    fn schema_invalid() -> Self {
        Self {
            quality_score: 0.0,
            reasons: vec![RejectReason::SchemaInvalid],
            metrics: QualityMetrics::default(),
        }
    }
}

/// Combines the score components with normalized weights.
///
/// `length_ratio` and `density_ratio` are the raw measurements divided by
/// their ceilings; both saturate at 1. The result is non-decreasing in each
/// of them, decreasing in `repetition`, and clamped to [0, 1].
pub fn combine_score(
    weights: &QualityWeights,
    length_ratio: f64,
    density_ratio: f64,
    repetition: f64,
) -> f64 {
    let w = weights.normalized();
    let length = length_ratio.clamp(0.0, 1.0);
    let relevance = density_ratio.clamp(0.0, 1.0);
    let originality = 1.0 - repetition.clamp(0.0, 1.0);

    (w.length * length + w.relevance * relevance + w.originality * originality).clamp(0.0, 1.0)
}

/// Evaluates records against length, relevance and repetition thresholds.
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    min_question_length: usize,
    min_answer_length: usize,
    min_answer_words: usize,
    length_ceiling: usize,
    density_ceiling: f64,
    weights: QualityWeights,
    repetition: RepetitionAnalyzer,
}

impl Default for QualityEvaluator {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}

impl QualityEvaluator {
    /// Creates an evaluator with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator from a quality configuration section.
    pub fn from_config(config: &QualityConfig) -> Self {
        Self {
            min_question_length: config.min_question_length,
            min_answer_length: config.min_answer_length,
            min_answer_words: config.min_answer_words,
            length_ceiling: config.length_ceiling.max(1),
            density_ceiling: config.density_ceiling,
            weights: config.weights.normalized(),
            repetition: RepetitionAnalyzer::with_thresholds(
                config.sentence_repetition_threshold,
                config.ngram_repetition_threshold,
            ),
        }
    }

    /// Creates a builder for configuring the evaluator.
    pub fn builder() -> QualityEvaluatorBuilder {
        QualityEvaluatorBuilder::default()
    }

    /// Sets custom weights for the score components.
    ///
    /// Weights are normalized so they sum to 1.0.
    pub fn with_weights(mut self, length: f64, relevance: f64, originality: f64) -> Self {
        self.weights = QualityWeights::new(length, relevance, originality).normalized();
        self
    }

    /// Returns the normalized weights in use.
    pub fn weights(&self) -> QualityWeights {
        self.weights
    }

    /// Returns `Some(SchemaInvalid)` if the id, question or answer is blank.
    pub fn check_schema(&self, record: &Record) -> Option<RejectReason> {
        if record.id.is_blank() || record.question.trim().is_empty() || record.answer.trim().is_empty()
        {
            Some(RejectReason::SchemaInvalid)
        } else {
            None
        }
    }

    /// Evaluates a record and returns its score and rejection reasons.
    pub fn evaluate(&self, record: &Record, lexicon: &Lexicon) -> Evaluation {
        if self.check_schema(record).is_some() {
            return Evaluation::schema_invalid();
        }

        let question = record.question.trim();
        let answer = record.answer.trim();
        let mut reasons = Vec::new();

        let question_chars = question.chars().count();
        let answer_chars = answer.chars().count();
        let answer_words = word_count(answer);

        if question_chars < self.min_question_length {
            reasons.push(RejectReason::TooShortQuestion);
        }
        if answer_chars < self.min_answer_length {
            reasons.push(RejectReason::TooShortAnswer);
        }
        if answer_words < self.min_answer_words {
            reasons.push(RejectReason::TooFewAnswerWords);
        }

        if !lexicon.contains_term(question) && !lexicon.contains_term(answer) {
            reasons.push(RejectReason::OffTopic);
        }

        let repetition = self.repetition.analyze(answer);
        if repetition.repetitive {
            reasons.push(RejectReason::SelfRepetitive);
        }

        let lexicon_hits = lexicon.find_terms(answer).len();
        let term_density = if answer_words == 0 {
            0.0
        } else {
            lexicon_hits as f64 / answer_words as f64
        };

        let metrics = QualityMetrics {
            question_chars,
            answer_chars,
            answer_words,
            lexicon_hits,
            term_density,
            sentence_repetition: repetition.sentence_ratio,
            ngram_repetition: repetition.ngram_ratio,
        };

        Evaluation {
            quality_score: self.score(&metrics, &repetition),
            reasons,
            metrics,
        }
    }

    fn score(&self, metrics: &QualityMetrics, repetition: &RepetitionReport) -> f64 {
        combine_score(
            &self.weights,
            metrics.answer_chars as f64 / self.length_ceiling as f64,
            metrics.term_density / self.density_ceiling,
            repetition.ratio(),
        )
    }
}

/// Builder for configuring a QualityEvaluator.
#[derive(Default)]
pub struct QualityEvaluatorBuilder {
    min_question_length: Option<usize>,
    min_answer_length: Option<usize>,
    min_answer_words: Option<usize>,
    length_ceiling: Option<usize>,
    density_ceiling: Option<f64>,
    weights: Option<QualityWeights>,
    sentence_threshold: Option<f64>,
    ngram_threshold: Option<f64>,
}

impl QualityEvaluatorBuilder {
    /// Sets the minimum question length in characters.
    pub fn min_question_length(mut self, chars: usize) -> Self {
        self.min_question_length = Some(chars);
        self
    }

    /// Sets the minimum answer length in characters.
    pub fn min_answer_length(mut self, chars: usize) -> Self {
        self.min_answer_length = Some(chars);
        self
    }

    /// Sets the minimum answer word count.
    pub fn min_answer_words(mut self, words: usize) -> Self {
        self.min_answer_words = Some(words);
        self
    }

    /// Sets the answer length at which the length component saturates.
    pub fn length_ceiling(mut self, chars: usize) -> Self {
        self.length_ceiling = Some(chars.max(1));
        self
    }

    /// Sets the term density at which the relevance component saturates.
    pub fn density_ceiling(mut self, density: f64) -> Self {
        self.density_ceiling = Some(density.clamp(f64::EPSILON, 1.0));
        self
    }

    /// Sets the score weights.
    pub fn weights(mut self, length: f64, relevance: f64, originality: f64) -> Self {
        self.weights = Some(QualityWeights::new(
            length.max(0.0),
            relevance.max(0.0),
            originality.max(0.0),
        ));
        self
    }

    /// Sets the sentence repetition threshold.
    pub fn sentence_repetition_threshold(mut self, threshold: f64) -> Self {
        self.sentence_threshold = Some(threshold.clamp(0.0, 1.0));
        self
    }

    /// Sets the trigram repetition threshold.
    pub fn ngram_repetition_threshold(mut self, threshold: f64) -> Self {
        self.ngram_threshold = Some(threshold.clamp(0.0, 1.0));
        self
    }

    /// Builds the QualityEvaluator.
    pub fn build(self) -> QualityEvaluator {
        let defaults = QualityConfig::default();
        let config = QualityConfig {
            min_question_length: self
                .min_question_length
                .unwrap_or(DEFAULT_MIN_QUESTION_LENGTH),
            min_answer_length: self.min_answer_length.unwrap_or(DEFAULT_MIN_ANSWER_LENGTH),
            min_answer_words: self.min_answer_words.unwrap_or(DEFAULT_MIN_ANSWER_WORDS),
            length_ceiling: self.length_ceiling.unwrap_or(DEFAULT_LENGTH_CEILING),
            density_ceiling: self.density_ceiling.unwrap_or(DEFAULT_DENSITY_CEILING),
            weights: self.weights.unwrap_or(defaults.weights),
            sentence_repetition_threshold: self
                .sentence_threshold
                .unwrap_or(defaults.sentence_repetition_threshold),
            ngram_repetition_threshold: self
                .ngram_threshold
                .unwrap_or(defaults.ngram_repetition_threshold),
        };

        QualityEvaluator::from_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_QUESTION: &str = "What is the effect of Śani in the seventh house?";
    const GOOD_ANSWER: &str = "Śani in the seventh bhāva tends to delay marriage, but the \
        partner is usually loyal and mature. Jupiter's aspect softens the delay.";

    fn lexicon() -> Lexicon {
        Lexicon::builtin()
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::TooShortQuestion.to_string(), "too_short_question");
        assert_eq!(RejectReason::SchemaInvalid.to_string(), "schema_invalid");
        assert_eq!(
            serde_json::to_string(&RejectReason::DuplicateNear).unwrap(),
            "\"duplicate_near\""
        );
        assert!(RejectReason::DuplicateExact.is_duplicate());
        assert!(!RejectReason::OffTopic.is_duplicate());
    }

    #[test]
    fn test_good_record_passes() {
        let evaluator = QualityEvaluator::new();
        let record = Record::new("r1", GOOD_QUESTION, GOOD_ANSWER);
        let evaluation = evaluator.evaluate(&record, &lexicon());

        assert!(evaluation.passed(), "reasons: {:?}", evaluation.reasons);
        assert!(evaluation.quality_score > 0.0 && evaluation.quality_score <= 1.0);
        assert!(evaluation.metrics.lexicon_hits >= 2);
    }

    #[test]
    fn test_blank_fields_are_schema_invalid() {
        let evaluator = QualityEvaluator::new();
        for record in [
            Record::new("r1", "   ", GOOD_ANSWER),
            Record::new("r1", GOOD_QUESTION, "\n\t"),
            Record::new("", GOOD_QUESTION, GOOD_ANSWER),
        ] {
            let evaluation = evaluator.evaluate(&record, &lexicon());
            assert_eq!(evaluation.reasons, vec![RejectReason::SchemaInvalid]);
            assert_eq!(evaluation.quality_score, 0.0);
        }
    }

    #[test]
    fn test_short_question_rejected() {
        let evaluator = QualityEvaluator::new();
        let record = Record::new("r1", "What is Śani?", GOOD_ANSWER);
        let evaluation = evaluator.evaluate(&record, &lexicon());
        assert_eq!(evaluation.reasons, vec![RejectReason::TooShortQuestion]);
    }

    #[test]
    fn test_length_reasons_are_all_collected() {
        let evaluator = QualityEvaluator::new();
        let record = Record::new("r1", "Why Śani?", "Delays.");
        let evaluation = evaluator.evaluate(&record, &lexicon());
        assert_eq!(
            evaluation.reasons,
            vec![
                RejectReason::TooShortQuestion,
                RejectReason::TooShortAnswer,
                RejectReason::TooFewAnswerWords,
            ]
        );
    }

    #[test]
    fn test_off_topic_rejected() {
        let evaluator = QualityEvaluator::new();
        let record = Record::new(
            "r1",
            "What is the best recipe for bread at home?",
            "Mix flour, water, salt and yeast, knead for ten minutes and bake until golden.",
        );
        let evaluation = evaluator.evaluate(&record, &lexicon());
        assert_eq!(evaluation.reasons, vec![RejectReason::OffTopic]);
    }

    #[test]
    fn test_term_in_question_only_is_relevant() {
        let evaluator = QualityEvaluator::new();
        let record = Record::new(
            "r1",
            "How does Shani behave in the tenth house?",
            "It brings slow but steady progress in career after sustained effort and patience.",
        );
        let evaluation = evaluator.evaluate(&record, &lexicon());
        assert!(evaluation.passed(), "reasons: {:?}", evaluation.reasons);
        assert_eq!(evaluation.metrics.lexicon_hits, 0);
    }

    #[test]
    fn test_self_repetitive_rejected() {
        let evaluator = QualityEvaluator::new();
        let record = Record::new(
            "r1",
            "What does Saturn give in the seventh house?",
            "Saturn gives delay in marriage. Saturn gives delay in marriage. \
             Saturn gives delay in marriage.",
        );
        let evaluation = evaluator.evaluate(&record, &lexicon());
        assert!(evaluation.reasons.contains(&RejectReason::SelfRepetitive));
    }

    #[test]
    fn test_score_non_decreasing_in_length() {
        let weights = QualityWeights::default();
        let mut previous = 0.0;
        for ratio in [0.0, 0.1, 0.25, 0.5, 0.99, 1.0, 1.5, 3.0] {
            let score = combine_score(&weights, ratio, 0.5, 0.1);
            assert!(score >= previous);
            previous = score;
        }
        // saturated past the ceiling
        assert_eq!(
            combine_score(&weights, 1.0, 0.5, 0.1),
            combine_score(&weights, 5.0, 0.5, 0.1)
        );
    }

    #[test]
    fn test_score_decreasing_in_repetition() {
        let weights = QualityWeights::default();
        let low = combine_score(&weights, 0.5, 0.5, 0.1);
        let high = combine_score(&weights, 0.5, 0.5, 0.6);
        assert!(low > high);
    }

    #[test]
    fn test_score_bounds() {
        let weights = QualityWeights::default();
        assert_eq!(combine_score(&weights, 0.0, 0.0, 1.0), 0.0);
        assert!((combine_score(&weights, 1.0, 1.0, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_builder() {
        let evaluator = QualityEvaluator::builder()
            .min_question_length(5)
            .min_answer_length(5)
            .min_answer_words(2)
            .weights(2.0, 1.0, 1.0)
            .build();

        assert!((evaluator.weights().length - 0.5).abs() < f64::EPSILON);
        let record = Record::new("r1", "Śani?", "Śani delays things.");
        let evaluation = evaluator.evaluate(&record, &lexicon());
        assert!(evaluation.passed(), "reasons: {:?}", evaluation.reasons);
    }

    #[test]
    fn test_weight_normalization() {
        let evaluator = QualityEvaluator::new().with_weights(1.0, 1.0, 1.0);
        let weights = evaluator.weights();
        let total = weights.length + weights.relevance + weights.originality;
        assert!((total - 1.0).abs() < f64::EPSILON);
    }
}
