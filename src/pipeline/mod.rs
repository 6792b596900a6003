//! Curation pipeline.
//!
//! # Architecture
//!
//! - **Config**: thresholds and rules for every component
//! - **Engine**: runs one pass over a candidate stream
//! - **Report**: outcome log, counters and the final report
//!
//! # Pipeline Flow
//!
//! 1. **Schema**: blank fields or a colliding id reject the candidate
//! 2. **Exact duplicates**: digest lookup against the accepted set
//! 3. **Quality**: length, relevance and repetition checks plus a score
//! 4. **Near duplicates**: similarity probe; the earlier record wins
//! 5. **Acceptance**: the pattern is classified once and stored
//! 6. **Rebalancing**: over-represented patterns are trimmed
//! 7. **Report**: statistics, histogram, entropy and recommendations
//!
//! # Example
//!
//! ```rust
//! use qa_forge::lexicon::Lexicon;
//! use qa_forge::pipeline::{CurationConfig, CurationEngine};
//! use qa_forge::record::Record;
//!
//! let config = CurationConfig::new()
//!     .with_min_question_length(10)
//!     .with_max_pattern_ratio(1.0);
//! let engine = CurationEngine::new(config, Lexicon::builtin())?;
//!
//! let output = engine.run(vec![Record::new(
//!     "tpl_0001",
//!     "What is the role of Śani in the seventh house?",
//!     "Śani in the seventh bhāva delays marriage but gives a loyal and mature partner.",
//! )])?;
//!
//! assert_eq!(output.accepted.len(), 1);
//! println!("{}", output.report.summary());
//! # Ok::<(), qa_forge::error::CurationError>(())
//! ```

pub mod config;
pub mod engine;
pub mod report;

// Re-export main types for convenience
pub use config::{
    ConfigError, CurationConfig, DiversityConfig, PatternRuleConfig, QualityConfig, QualityWeights,
    SimilarityConfig,
};
pub use engine::{CurationEngine, CurationOutput, FilterPass};
pub use report::{
    CorpusStats, CurationReport, FilterOutcome, FilterStats, LengthStats, OutcomeEntry,
    RebalanceSummary,
};
