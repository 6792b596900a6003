//! Error types for qa-forge operations.
//!
//! Per-record problems are never errors: they become rejection reasons in
//! the outcome log. The types here cover the conditions that stop a whole
//! pass or a shell operation:
//! - Lexicon loading and parsing
//! - JSONL ingestion and output
//! - Configuration problems surfaced by the curation engine

use thiserror::Error;

use crate::pipeline::config::ConfigError;

/// Errors that can occur while loading a domain lexicon.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Lexicon term is empty after normalization: '{0}'")]
    EmptyTerm(String),

    #[error("Unsupported lexicon file format '{0}': expected .yaml, .yml or .json")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during a curation run or its surrounding I/O.
#[derive(Debug, Error)]
pub enum CurationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("Malformed JSONL at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
