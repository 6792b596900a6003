//! Curation configuration.
//!
//! The configuration bundle is split by component: [`QualityConfig`] for the
//! evaluator, [`SimilarityConfig`] for the duplicate index and
//! [`DiversityConfig`] for the analyzer and rebalancer. Every field has a
//! default, so a YAML file only needs to list what it changes.
//!
//! Values are resolved in this order (later wins): defaults, YAML file,
//! `QA_FORGE_*` environment variables, command-line flags.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diversity::patterns::{PatternRule, RuleKind};
use crate::diversity::similarity::SimilarityMetric;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or flag has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid YAML.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Relative weights of the quality score components.
///
/// Weights are normalized to sum to 1.0 by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    /// Weight of the saturating answer length.
    pub length: f64,
    /// Weight of the lexicon term density.
    pub relevance: f64,
    /// Weight of `1 - repetition_ratio`.
    pub originality: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            length: 0.4,
            relevance: 0.3,
            originality: 0.3,
        }
    }
}

impl QualityWeights {
    /// Creates weights from raw, not yet normalized, values.
    pub fn new(length: f64, relevance: f64, originality: f64) -> Self {
        Self {
            length,
            relevance,
            originality,
        }
    }

    /// Sum of the raw weights.
    pub fn total(&self) -> f64 {
        self.length + self.relevance + self.originality
    }

    /// Returns the weights scaled to sum to 1.0, or the defaults when the
    /// total is not positive.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total > 0.0 && total.is_finite() {
            Self::new(
                self.length / total,
                self.relevance / total,
                self.originality / total,
            )
        } else {
            Self::default()
        }
    }
}

/// Per-record quality thresholds and score shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Minimum question length in characters.
    pub min_question_length: usize,
    /// Minimum answer length in characters.
    pub min_answer_length: usize,
    /// Minimum number of whitespace-separated words in the answer.
    pub min_answer_words: usize,
    /// Repeated sentences / total sentences above which an answer is
    /// self-repetitive.
    pub sentence_repetition_threshold: f64,
    /// Repeated word trigrams / total trigrams above which an answer is
    /// self-repetitive.
    pub ngram_repetition_threshold: f64,
    /// Answer length (characters) at which the length component saturates.
    pub length_ceiling: usize,
    /// Lexicon term density at which the relevance component saturates.
    pub density_ceiling: f64,
    /// Score component weights.
    pub weights: QualityWeights,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_question_length: 20,
            min_answer_length: 30,
            min_answer_words: 10,
            sentence_repetition_threshold: 0.3,
            ngram_repetition_threshold: 0.5,
            length_ceiling: 400,
            density_ceiling: 0.15,
            weights: QualityWeights::default(),
        }
    }
}

/// Duplicate index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Similarity at or above which a record is a near duplicate.
    pub similarity_threshold: f64,
    /// Similarity function applied to normalized text.
    pub metric: SimilarityMetric,
    /// Index size below which every accepted record is compared.
    pub bucket_cutoff: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            metric: SimilarityMetric::Levenshtein,
            bucket_cutoff: 64,
        }
    }
}

/// A user-supplied classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRuleConfig {
    /// Bucket assigned when the rule matches.
    pub label: String,
    /// Regular expression body, without anchors.
    pub pattern: String,
    /// Whether the rule anchors at the start or matches a whole word anywhere.
    #[serde(default)]
    pub kind: RuleKind,
}

/// Distribution analysis and rebalancing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    /// Largest share any single pattern may hold after rebalancing.
    pub max_pattern_ratio: f64,
    /// Rebalancing never shrinks the accepted set below this size.
    pub min_corpus_floor: usize,
    /// Upper bound on rebalancing removals.
    pub max_rebalance_passes: usize,
    /// Expected patterns below this share are reported as under-represented.
    pub under_represented_floor: f64,
    /// Patterns a healthy corpus is expected to contain.
    pub expected_patterns: Vec<String>,
    /// Fewer distinct patterns than this flags low diversity.
    pub min_distinct_patterns: usize,
    /// Run the rebalancer after filtering.
    pub rebalance: bool,
    /// Custom taxonomy; empty selects the built-in rules.
    pub pattern_rules: Vec<PatternRuleConfig>,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            max_pattern_ratio: 0.15,
            min_corpus_floor: 0,
            max_rebalance_passes: 10_000,
            under_represented_floor: 0.05,
            expected_patterns: ["how_does", "why", "compare", "analyze", "predict", "conditional"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_distinct_patterns: 3,
            rebalance: true,
            pattern_rules: Vec::new(),
        }
    }
}

/// Complete configuration bundle for one curation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    pub quality: QualityConfig,
    pub similarity: SimilarityConfig,
    pub diversity: DiversityConfig,
}

impl CurationConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a YAML configuration file. Missing sections and fields keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Yaml`. The result is not
    /// validated; call [`CurationConfig::validate`] once all overrides are in.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses a YAML configuration document.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    /// Creates configuration from defaults and environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the result
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `QA_FORGE_*` environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QA_FORGE_MIN_QUESTION_LENGTH`: Minimum question characters (default: 20)
    /// - `QA_FORGE_MIN_ANSWER_LENGTH`: Minimum answer characters (default: 30)
    /// - `QA_FORGE_MIN_ANSWER_WORDS`: Minimum answer words (default: 10)
    /// - `QA_FORGE_SIMILARITY_THRESHOLD`: Near-duplicate threshold (default: 0.85)
    /// - `QA_FORGE_MAX_PATTERN_RATIO`: Largest pattern share (default: 0.15)
    /// - `QA_FORGE_MIN_CORPUS_FLOOR`: Rebalancing floor (default: 0)
    /// - `QA_FORGE_MAX_REBALANCE_PASSES`: Rebalancing budget (default: 10000)
    /// - `QA_FORGE_REBALANCE`: Enable rebalancing (default: true)
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = lookup("QA_FORGE_MIN_QUESTION_LENGTH") {
            self.quality.min_question_length =
                parse_env_value(&val, "QA_FORGE_MIN_QUESTION_LENGTH")?;
        }

        if let Some(val) = lookup("QA_FORGE_MIN_ANSWER_LENGTH") {
            self.quality.min_answer_length = parse_env_value(&val, "QA_FORGE_MIN_ANSWER_LENGTH")?;
        }

        if let Some(val) = lookup("QA_FORGE_MIN_ANSWER_WORDS") {
            self.quality.min_answer_words = parse_env_value(&val, "QA_FORGE_MIN_ANSWER_WORDS")?;
        }

        if let Some(val) = lookup("QA_FORGE_SIMILARITY_THRESHOLD") {
            self.similarity.similarity_threshold =
                parse_env_value(&val, "QA_FORGE_SIMILARITY_THRESHOLD")?;
        }

        if let Some(val) = lookup("QA_FORGE_MAX_PATTERN_RATIO") {
            self.diversity.max_pattern_ratio = parse_env_value(&val, "QA_FORGE_MAX_PATTERN_RATIO")?;
        }

        if let Some(val) = lookup("QA_FORGE_MIN_CORPUS_FLOOR") {
            self.diversity.min_corpus_floor = parse_env_value(&val, "QA_FORGE_MIN_CORPUS_FLOOR")?;
        }

        if let Some(val) = lookup("QA_FORGE_MAX_REBALANCE_PASSES") {
            self.diversity.max_rebalance_passes =
                parse_env_value(&val, "QA_FORGE_MAX_REBALANCE_PASSES")?;
        }

        if let Some(val) = lookup("QA_FORGE_REBALANCE") {
            self.diversity.rebalance = parse_env_bool(&val, "QA_FORGE_REBALANCE")?;
        }

        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let quality = &self.quality;

        check_unit_interval(
            "sentence_repetition_threshold",
            quality.sentence_repetition_threshold,
        )?;
        check_unit_interval(
            "ngram_repetition_threshold",
            quality.ngram_repetition_threshold,
        )?;

        if quality.length_ceiling == 0 {
            return Err(ConfigError::ValidationFailed(
                "length_ceiling must be greater than 0".to_string(),
            ));
        }

        if !(quality.density_ceiling > 0.0 && quality.density_ceiling <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "density_ceiling must be in (0.0, 1.0]".to_string(),
            ));
        }

        let weights = &quality.weights;
        let raw = [weights.length, weights.relevance, weights.originality];
        if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::ValidationFailed(
                "weights cannot be negative".to_string(),
            ));
        }
        if weights.total() <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "weights cannot all be zero".to_string(),
            ));
        }

        let threshold = self.similarity.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "similarity_threshold must be in (0.0, 1.0]".to_string(),
            ));
        }

        let diversity = &self.diversity;
        if !(diversity.max_pattern_ratio > 0.0 && diversity.max_pattern_ratio <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "max_pattern_ratio must be in (0.0, 1.0]".to_string(),
            ));
        }

        check_unit_interval("under_represented_floor", diversity.under_represented_floor)?;

        for rule in &diversity.pattern_rules {
            PatternRule::new(rule.label.clone(), &rule.pattern, rule.kind)?;
        }

        Ok(())
    }

    /// Validates the configuration against the size of the candidate stream.
    ///
    /// # Errors
    ///
    /// In addition to [`CurationConfig::validate`], fails when
    /// `min_corpus_floor` exceeds the number of candidates.
    pub fn validate_for_candidates(&self, candidates: usize) -> Result<(), ConfigError> {
        self.validate()?;

        if self.diversity.min_corpus_floor > candidates {
            return Err(ConfigError::ValidationFailed(format!(
                "min_corpus_floor ({}) exceeds the candidate count ({})",
                self.diversity.min_corpus_floor, candidates
            )));
        }

        Ok(())
    }

    /// Builder method to set the minimum question length.
    pub fn with_min_question_length(mut self, chars: usize) -> Self {
        self.quality.min_question_length = chars;
        self
    }

    /// Builder method to set the minimum answer length.
    pub fn with_min_answer_length(mut self, chars: usize) -> Self {
        self.quality.min_answer_length = chars;
        self
    }

    /// Builder method to set the minimum answer word count.
    pub fn with_min_answer_words(mut self, words: usize) -> Self {
        self.quality.min_answer_words = words;
        self
    }

    /// Builder method to set the quality score weights.
    pub fn with_weights(mut self, weights: QualityWeights) -> Self {
        self.quality.weights = weights;
        self
    }

    /// Builder method to set the near-duplicate threshold.
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity.similarity_threshold = threshold;
        self
    }

    /// Builder method to set the similarity metric.
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.similarity.metric = metric;
        self
    }

    /// Builder method to set the full-scan cutoff of the index.
    pub fn with_bucket_cutoff(mut self, cutoff: usize) -> Self {
        self.similarity.bucket_cutoff = cutoff;
        self
    }

    /// Builder method to set the largest allowed pattern share.
    pub fn with_max_pattern_ratio(mut self, ratio: f64) -> Self {
        self.diversity.max_pattern_ratio = ratio;
        self
    }

    /// Builder method to set the rebalancing floor.
    pub fn with_min_corpus_floor(mut self, floor: usize) -> Self {
        self.diversity.min_corpus_floor = floor;
        self
    }

    /// Builder method to set the rebalancing budget.
    pub fn with_max_rebalance_passes(mut self, passes: usize) -> Self {
        self.diversity.max_rebalance_passes = passes;
        self
    }

    /// Builder method to enable or disable rebalancing.
    pub fn with_rebalance(mut self, enabled: bool) -> Self {
        self.diversity.rebalance = enabled;
        self
    }
}

fn check_unit_interval(key: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(format!(
            "{} must be between 0.0 and 1.0",
            key
        )))
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
