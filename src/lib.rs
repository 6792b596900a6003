//! qa-forge: quality and diversity curation for generated Q&A datasets.
//!
//! This library screens candidate records for length, domain relevance and
//! repetition, removes exact and near duplicates, and rebalances the
//! accepted set across question patterns.

// Core modules
pub mod cli;
pub mod diversity;
pub mod error;
pub mod export;
pub mod lexicon;
pub mod pipeline;
pub mod quality;
pub mod record;

// Re-export commonly used types
pub use error::{CurationError, LexiconError};
pub use lexicon::Lexicon;
pub use pipeline::{CurationConfig, CurationEngine, CurationOutput, CurationReport};
pub use record::{Record, RecordId};
