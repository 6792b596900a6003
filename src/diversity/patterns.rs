//! Question-pattern taxonomy.
//!
//! A question is assigned to the first rule that matches its trimmed,
//! lowercased text. Rule order is part of the contract: reordering rules
//! changes classifications. Questions matching no rule fall into
//! [`OTHER_PATTERN`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pipeline::config::{ConfigError, PatternRuleConfig};

/// Bucket for questions no rule matches.
pub const OTHER_PATTERN: &str = "other";

/// How a rule's expression is anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Must match at the start of the question.
    #[default]
    Prefix,
    /// Must match as whole words anywhere in the question.
    Keyword,
}

/// Built-in rules, in priority order: (label, expression, kind).
const BUILTIN_RULES: &[(&str, &str, RuleKind)] = &[
    ("what_is", r"what is\b", RuleKind::Prefix),
    ("what_are", r"what are\b", RuleKind::Prefix),
    ("what_does", r"what does\b", RuleKind::Prefix),
    ("how_does", r"how does\b", RuleKind::Prefix),
    ("how_is", r"how is\b", RuleKind::Prefix),
    ("how_do", r"how do\b", RuleKind::Prefix),
    ("how_to", r"how to\b", RuleKind::Prefix),
    ("why", r"why\b", RuleKind::Prefix),
    ("when", r"when\b", RuleKind::Prefix),
    ("where", r"where\b", RuleKind::Prefix),
    ("which", r"which\b", RuleKind::Prefix),
    ("explain", r"explain\b", RuleKind::Prefix),
    ("describe", r"describe\b", RuleKind::Prefix),
    ("define", r"define\b", RuleKind::Prefix),
    ("compare", r"compare|contrast", RuleKind::Prefix),
    ("compare", r"difference between", RuleKind::Keyword),
    ("analyze", r"analyze|analyse", RuleKind::Prefix),
    ("interpret", r"interpret", RuleKind::Prefix),
    ("predict", r"predict|forecast", RuleKind::Prefix),
    ("conditional", r"if\b", RuleKind::Prefix),
    ("given", r"given\b", RuleKind::Prefix),
    ("suppose", r"suppose\b", RuleKind::Prefix),
];

/// One classification rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    label: String,
    kind: RuleKind,
    regex: Regex,
}

impl PatternRule {
    /// Compiles a rule. `pattern` is a regular expression body; the anchor
    /// is added according to `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the label is blank or the
    /// expression does not compile.
    pub fn new(label: impl Into<String>, pattern: &str, kind: RuleKind) -> Result<Self, ConfigError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "pattern_rules".to_string(),
                message: format!("rule '{}' has an empty label", pattern),
            });
        }

        let anchored = match kind {
            RuleKind::Prefix => format!(r"^(?:{})", pattern),
            RuleKind::Keyword => format!(r"\b(?:{})\b", pattern),
        };
        let regex = Regex::new(&anchored).map_err(|e| ConfigError::InvalidValue {
            key: format!("pattern_rules.{}", label),
            message: e.to_string(),
        })?;

        Ok(Self { label, kind, regex })
    }

    /// Bucket assigned on match.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Tests an already trimmed and lowercased question.
    pub fn is_match(&self, question: &str) -> bool {
        self.regex.is_match(question)
    }
}

fn builtin_rules() -> &'static [PatternRule] {
    static RULES: OnceLock<Vec<PatternRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        BUILTIN_RULES
            .iter()
            .map(|(label, pattern, kind)| {
                PatternRule::new(*label, pattern, *kind)
                    .expect("Invalid regex for built-in pattern rule")
            })
            .collect()
    })
}

/// Maps questions to pattern buckets.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    rules: Vec<PatternRule>,
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PatternClassifier {
    /// Creates a classifier from rules in priority order.
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    /// Returns the built-in taxonomy.
    pub fn builtin() -> Self {
        Self::new(builtin_rules().to_vec())
    }

    /// Compiles configured rules; an empty list selects the built-in taxonomy.
    pub fn from_config(rules: &[PatternRuleConfig]) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Ok(Self::builtin());
        }

        let compiled = rules
            .iter()
            .map(|rule| PatternRule::new(rule.label.clone(), &rule.pattern, rule.kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(compiled))
    }

    /// Returns the label of the first matching rule, or [`OTHER_PATTERN`].
    pub fn classify(&self, question: &str) -> &str {
        let question = question.trim().to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.is_match(&question))
            .map(PatternRule::label)
            .unwrap_or(OTHER_PATTERN)
    }

    /// Distinct labels in rule order, followed by [`OTHER_PATTERN`].
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !labels.contains(&rule.label()) {
                labels.push(rule.label());
            }
        }
        if !labels.contains(&OTHER_PATTERN) {
            labels.push(OTHER_PATTERN);
        }
        labels
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classification() {
        let classifier = PatternClassifier::builtin();
        let cases = [
            ("What is the role of Śani in the 7th house?", "what_is"),
            ("what are the nakshatras ruled by Ketu?", "what_are"),
            ("How does Rahu affect the lagna?", "how_does"),
            ("How do dashas work?", "how_do"),
            ("Why is Saturn called a malefic?", "why"),
            ("Compare Mars and Ketu as indicators of energy.", "compare"),
            ("Contrast Jupiter and Venus.", "compare"),
            ("Analyse the effect of Moon in the 4th.", "analyze"),
            ("Predict the results of Venus dasha.", "predict"),
            ("If Saturn aspects the Moon, what happens?", "conditional"),
            ("Given Mars in Aries, what follows?", "given"),
            ("Tell me about Guru.", "other"),
        ];
        for (question, expected) in cases {
            assert_eq!(classifier.classify(question), expected, "{}", question);
        }
    }

    #[test]
    fn test_keyword_rule_matches_anywhere() {
        let classifier = PatternClassifier::builtin();
        assert_eq!(
            classifier.classify("Tell me the difference between rasi and navamsa."),
            "compare"
        );
    }

    #[test]
    fn test_priority_order_first_match_wins() {
        let classifier = PatternClassifier::builtin();
        // prefix "what is" comes before the "difference between" keyword
        assert_eq!(
            classifier.classify("What is the difference between rasi and bhava?"),
            "what_is"
        );
    }

    #[test]
    fn test_word_boundary() {
        let classifier = PatternClassifier::builtin();
        assert_eq!(classifier.classify("Whyte's theory of houses?"), "other");
        assert_eq!(classifier.classify("   WHY does Mars burn?"), "why");
    }

    #[test]
    fn test_custom_rules_from_config() {
        let rules = vec![
            PatternRuleConfig {
                label: "yoga_question".to_string(),
                pattern: "yoga".to_string(),
                kind: RuleKind::Keyword,
            },
            PatternRuleConfig {
                label: "what_is".to_string(),
                pattern: "what is".to_string(),
                kind: RuleKind::Prefix,
            },
        ];
        let classifier = PatternClassifier::from_config(&rules).unwrap();
        assert_eq!(classifier.classify("What is Gaja Kesari yoga?"), "yoga_question");
        assert_eq!(classifier.classify("What is lagna?"), "what_is");
        assert_eq!(classifier.classify("Why?"), "other");
        assert_eq!(classifier.labels(), vec!["yoga_question", "what_is", "other"]);
    }

    #[test]
    fn test_empty_config_selects_builtin() {
        let classifier = PatternClassifier::from_config(&[]).unwrap();
        assert_eq!(classifier.rules().len(), BUILTIN_RULES.len());
    }

    #[test]
    fn test_invalid_rule() {
        let err = PatternRule::new("bad", "(oops", RuleKind::Prefix).unwrap_err();
        assert!(err.to_string().contains("bad"));

        let err = PatternRule::new(" ", "why", RuleKind::Prefix).unwrap_err();
        assert!(err.to_string().contains("empty label"));
    }
}
