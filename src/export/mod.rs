//! Reading and writing record files.
//!
//! Provides JSONL ingestion and the output files of a curation run.

pub mod jsonl;

pub use jsonl::{
    derive_id, parse_jsonl, read_jsonl, to_jsonl, write_json_pretty, write_jsonl, write_output,
    OutputPaths, WriteSummary,
};
