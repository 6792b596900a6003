//! Self-repetition analysis for answers.
//!
//! Two ratios are computed:
//! - sentence repetition: repeated sentences / total sentences, after
//!   normalization, so "Śani delays." and "śani delays!" count as one.
//! - word-trigram repetition: `1 - unique / total` trigrams, only for texts
//!   with at least six words.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::record::normalize_text;

/// Default sentence repetition threshold.
const DEFAULT_SENTENCE_THRESHOLD: f64 = 0.3;

/// Default trigram repetition threshold.
const DEFAULT_NGRAM_THRESHOLD: f64 = 0.5;

/// N-gram size used for phrase repetition.
const NGRAM_SIZE: usize = 3;

fn sentence_boundary() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Latin terminators plus the Devanagari danda and double danda.
    PATTERN.get_or_init(|| Regex::new(r"[.!?।॥]+").expect("Invalid regex for sentence boundary"))
}

/// Splits text into normalized, non-empty sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    sentence_boundary()
        .split(text)
        .map(normalize_text)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Fraction of sentences that repeat an earlier sentence.
pub fn sentence_repetition_ratio(text: &str) -> f64 {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }

    let distinct: HashSet<&str> = sentences.iter().map(String::as_str).collect();
    (sentences.len() - distinct.len()) as f64 / sentences.len() as f64
}

/// Fraction of repeated word n-grams. Texts shorter than `2 * n` words
/// return 0.0.
pub fn ngram_repetition_ratio(text: &str, n: usize) -> f64 {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    if n == 0 || words.len() < n * 2 {
        return 0.0;
    }

    let ngrams: Vec<&[String]> = words.windows(n).collect();
    let unique: HashSet<&[String]> = ngrams.iter().copied().collect();
    1.0 - unique.len() as f64 / ngrams.len() as f64
}

/// Result of a repetition analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepetitionReport {
    /// Repeated sentences / total sentences.
    pub sentence_ratio: f64,
    /// Repeated trigrams / total trigrams.
    pub ngram_ratio: f64,
    /// Whether either ratio exceeded its threshold.
    pub repetitive: bool,
}

impl RepetitionReport {
    /// The larger of the two ratios; drives the originality score component.
    pub fn ratio(&self) -> f64 {
        self.sentence_ratio.max(self.ngram_ratio)
    }
}

/// Detects answers that repeat themselves.
#[derive(Debug, Clone)]
pub struct RepetitionAnalyzer {
    sentence_threshold: f64,
    ngram_threshold: f64,
}

impl Default for RepetitionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl RepetitionAnalyzer {
    /// Creates an analyzer with the default thresholds.
    pub fn new() -> Self {
        Self {
            sentence_threshold: DEFAULT_SENTENCE_THRESHOLD,
            ngram_threshold: DEFAULT_NGRAM_THRESHOLD,
        }
    }

    /// Creates an analyzer with custom thresholds, clamped to [0, 1].
    pub fn with_thresholds(sentence_threshold: f64, ngram_threshold: f64) -> Self {
        Self {
            sentence_threshold: sentence_threshold.clamp(0.0, 1.0),
            ngram_threshold: ngram_threshold.clamp(0.0, 1.0),
        }
    }

    /// Analyzes a text. A ratio strictly above its threshold is repetitive.
    pub fn analyze(&self, text: &str) -> RepetitionReport {
        let sentence_ratio = sentence_repetition_ratio(text);
        let ngram_ratio = ngram_repetition_ratio(text, NGRAM_SIZE);

        RepetitionReport {
            sentence_ratio,
            ngram_ratio,
            repetitive: sentence_ratio > self.sentence_threshold
                || ngram_ratio > self.ngram_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_handles_dandas() {
        let sentences = split_sentences("Śani rules Makara। Guru rules Dhanu॥ Done!");
        assert_eq!(sentences, vec!["śani rules makara", "guru rules dhanu", "done"]);
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("...!?").is_empty());
    }

    #[test]
    fn test_sentence_ratio_counts_repeats() {
        let text = "Saturn delays. Saturn delays! Saturn delays? Mars acts.";
        // four sentences, two distinct
        assert!((sentence_repetition_ratio(text) - 0.5).abs() < 1e-12);
        assert_eq!(sentence_repetition_ratio("One. Two. Three."), 0.0);
    }

    #[test]
    fn test_ngram_ratio_short_text_is_zero() {
        assert_eq!(ngram_repetition_ratio("a b c d e", 3), 0.0);
    }

    #[test]
    fn test_ngram_ratio_repeated_phrase() {
        let text = "the moon is strong the moon is strong the moon is strong";
        let ratio = ngram_repetition_ratio(text, 3);
        // 10 trigrams, 4 unique
        assert!((ratio - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_analyzer_flags_repetitive_answer() {
        let analyzer = RepetitionAnalyzer::new();
        let report = analyzer.analyze("Saturn delays. Saturn delays. Saturn delays.");
        assert!(report.repetitive);
        assert!(report.ratio() > 0.6);

        let clean = analyzer.analyze(
            "Saturn in the seventh house delays marriage. Jupiter's aspect softens the delay.",
        );
        assert!(!clean.repetitive);
        assert_eq!(clean.ratio(), 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        // two sentences, one repeat: ratio 0.5
        let analyzer = RepetitionAnalyzer::with_thresholds(0.5, 1.0);
        assert!(!analyzer.analyze("Same thing. Same thing.").repetitive);

        let analyzer = RepetitionAnalyzer::with_thresholds(0.49, 1.0);
        assert!(analyzer.analyze("Same thing. Same thing.").repetitive);
    }
}
