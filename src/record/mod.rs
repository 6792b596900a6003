//! Q&A record model and text normalization.
//!
//! Records are produced by external generators and flow through the engine
//! unchanged; the engine only attaches derived fields (pattern, quality
//! score, normalized text) in a [`CuratedRecord`].

pub mod normalize;
pub mod types;

pub use normalize::{fold_tokens, normalize_text, word_count};
pub use types::{CuratedRecord, Record, RecordId, RecordMetadata};
