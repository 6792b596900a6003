//! Duplicate detection and corpus diversity.
//!
//! This module keeps the accepted set free of duplicates and balanced
//! across question patterns.
//!
//! # Overview
//!
//! 1. **Similarity** - Symmetric text similarity (character edit ratio or
//!    token Jaccard) with exact pruning bounds
//! 2. **Index** - The growing set of accepted records, answering exact and
//!    near-duplicate probes
//! 3. **Patterns** - Priority-ordered question taxonomy
//! 4. **Metrics** - Entropy, Gini and the diversity report
//! 5. **Rebalance** - Bounded greedy removal from over-represented patterns
//!
//! # Usage
//!
//! ```rust
//! use qa_forge::diversity::{DiversityAnalyzer, SimilarityIndex};
//! use qa_forge::record::Record;
//!
//! let mut index = SimilarityIndex::new(0.85);
//! let first = index.offer(&Record::new("a", "What is lagna?", "The ascendant."));
//! let again = index.offer(&Record::new("b", "WHAT IS LAGNA", "the ascendant"));
//! assert!(first.accepted);
//! assert!(!again.accepted);
//!
//! let report = DiversityAnalyzer::new().analyze_records(&[
//!     Record::new("a", "What is lagna?", "The ascendant."),
//!     Record::new("c", "Why is Saturn slow?", "It is far away."),
//! ]);
//! assert_eq!(report.distinct_patterns, 2);
//! ```

pub mod index;
pub mod metrics;
pub mod patterns;
pub mod rebalance;
pub mod similarity;

pub use index::{compared_text, exact_key, IndexStats, Offer, SimilarityIndex, SimilarityIndexBuilder};
pub use metrics::{
    balance_feasible, gini_coefficient, min_patterns_for_ratio, normalized_entropy, shannon_entropy,
    DiversityAnalyzer, DiversityReport,
};
pub use patterns::{PatternClassifier, PatternRule, RuleKind, OTHER_PATTERN};
pub use rebalance::{RebalanceOutcome, Rebalancer, RemovedRecord, StopCondition};
pub use similarity::{levenshtein_ratio, similarity, size_window, token_jaccard, SimilarityMetric, TextProfile};
