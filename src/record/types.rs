//! Record types for generated Q&A pairs.
//!
//! A [`Record`] mirrors the JSONL shape written by the upstream generators:
//! a flat object with `id`, `question`, `answer` and metadata fields. Fields
//! the engine does not know about are kept in [`Record::extra`] so a record
//! written back out carries everything the producer put in.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stable identifier assigned to a record by its producer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a record identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Producer-supplied descriptive fields of a record.
///
/// A field is `None` only when the producer left it out, so a field sent
/// as `""`, `[]` or `null` is written back the same way. An explicit
/// `null` for a text field other than `category` reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Kind of Q&A pair (e.g. "definition", "interpretation").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_type: Option<String>,

    /// Difficulty label assigned by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,

    /// Optional topical category; `Some(None)` is an explicit `null`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,

    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,

    /// Descriptor of the producing component (template id, PDF page, model...).
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<Value>,

    /// How the record was generated: template, pdf_extract, llm, augmented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_method: Option<String>,
}

impl RecordMetadata {
    /// Kind of Q&A pair; empty when not given.
    pub fn qa_type(&self) -> &str {
        self.qa_type.as_deref().unwrap_or_default()
    }

    /// Difficulty label; empty when not given.
    pub fn difficulty(&self) -> &str {
        self.difficulty.as_deref().unwrap_or_default()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_ref().and_then(|c| c.as_deref())
    }

    /// Builder method to set the Q&A kind.
    pub fn with_qa_type(mut self, qa_type: impl Into<String>) -> Self {
        self.qa_type = Some(qa_type.into());
        self
    }
}

// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A candidate Q&A record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Producer-assigned identifier, never reassigned by the engine.
    #[serde(default)]
    pub id: RecordId,

    /// Question text, preserved byte-for-byte.
    #[serde(default)]
    pub question: String,

    /// Answer text, preserved byte-for-byte.
    #[serde(default)]
    pub answer: String,

    /// Descriptive metadata.
    #[serde(flatten)]
    pub metadata: RecordMetadata,

    /// Producer fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Creates a record with empty metadata.
    pub fn new(
        id: impl Into<RecordId>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            metadata: RecordMetadata::default(),
            extra: Map::new(),
        }
    }

    /// Sets the metadata block.
    pub fn with_metadata(mut self, metadata: RecordMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builds a placeholder for an input object whose fields had the wrong
    /// shape. The raw object is kept in `extra`, with `question` and
    /// `answer` moved to `raw_question` and `raw_answer`; the modelled
    /// fields stay empty so the record is rejected as schema-invalid.
    pub fn malformed(id: RecordId, mut raw: Map<String, Value>) -> Self {
        raw.remove("id");
        for key in ["question", "answer"] {
            if let Some(value) = raw.remove(key) {
                raw.insert(format!("raw_{}", key), value);
            }
        }

        Self {
            id,
            question: String::new(),
            answer: String::new(),
            metadata: RecordMetadata::default(),
            extra: raw,
        }
    }
}

/// A record accepted into the working set, with its engine-computed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CuratedRecord {
    /// The untouched producer record.
    pub record: Record,

    /// Question-pattern bucket, classified once at acceptance.
    pub pattern: String,

    /// Quality score in [0, 1]; higher is better.
    pub quality_score: f64,

    /// Comparison-only form of the question.
    pub normalized_question: String,

    /// Comparison-only form of the answer.
    pub normalized_answer: String,

    /// Position of the record in the candidate stream.
    pub sequence: usize,
}

impl CuratedRecord {
    /// Returns the record identifier.
    pub fn id(&self) -> &RecordId {
        &self.record.id
    }
}
