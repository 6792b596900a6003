//! JSONL ingestion and output.
//!
//! One JSON object per line on both sides. Records missing an `id` get a
//! deterministic one derived from the question text, so re-running a file
//! yields the same ids.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CurationError;
use crate::pipeline::CurationOutput;
use crate::record::{Record, RecordId};

/// Derives the id used when a record arrives without one.
pub fn derive_id(question: &str) -> RecordId {
    RecordId::new(Uuid::new_v5(&Uuid::NAMESPACE_OID, question.as_bytes()).to_string())
}

/// Parses JSONL text into records.
///
/// Blank lines are skipped. A line that is not a JSON object stops the
/// parse with its 1-based line number. An object whose fields have the
/// wrong types becomes a placeholder record that the engine rejects as
/// schema-invalid.
pub fn parse_jsonl(input: &str) -> Result<Vec<Record>, CurationError> {
    let mut records = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|e| CurationError::Parse {
            line: index + 1,
            message: e.to_string(),
        })?;

        let Value::Object(object) = value else {
            return Err(CurationError::Parse {
                line: index + 1,
                message: "expected a JSON object".to_string(),
            });
        };

        records.push(record_from_object(object, index + 1));
    }

    Ok(records)
}

fn record_from_object(mut object: Map<String, Value>, line: usize) -> Record {
    let id = match object.get("id") {
        Some(Value::String(id)) => RecordId::new(id.clone()),
        Some(Value::Number(n)) => RecordId::new(n.to_string()),
        _ => {
            let question = object
                .get("question")
                .and_then(Value::as_str)
                .unwrap_or_default();
            derive_id(question)
        }
    };
    object.insert("id".to_string(), Value::String(id.as_str().to_string()));

    match serde_json::from_value::<Record>(Value::Object(object.clone())) {
        Ok(record) => record,
        Err(e) => {
            debug!(line, id = %id, error = %e, "Malformed record kept as placeholder");
            Record::malformed(id, object)
        }
    }
}

/// Reads and parses a JSONL file.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<Record>, CurationError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let records = parse_jsonl(&content)?;
    info!(path = %path.display(), count = records.len(), "Loaded records");
    Ok(records)
}

/// Serializes items as JSONL text.
pub fn to_jsonl<'a, T, I>(items: I) -> Result<String, CurationError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

/// Writes items as JSONL, creating parent directories. Returns the number
/// of lines written.
pub fn write_jsonl<'a, T, I>(path: impl AsRef<Path>, items: I) -> Result<usize, CurationError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let path = path.as_ref();
    ensure_parent(path)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;

    for item in items {
        let json_line = serde_json::to_string(item)?;
        writeln!(writer, "{}", json_line)?;
        written += 1;
    }

    writer.flush()?;
    debug!(path = %path.display(), written, "Wrote JSONL");
    Ok(written)
}

/// Writes a value as pretty-printed JSON.
pub fn write_json_pretty<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), CurationError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), CurationError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Files produced by one curation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Kept records.
    pub kept: PathBuf,
    /// Rejected and rebalanced-out records.
    pub removed: PathBuf,
    /// Pretty-printed report.
    pub report: PathBuf,
    /// One outcome entry per candidate.
    pub outcomes: PathBuf,
}

impl OutputPaths {
    /// Derives sibling paths from the kept-records path:
    /// `clean.jsonl` gives `clean.removed.jsonl`, `clean.report.json` and
    /// `clean.outcomes.jsonl`.
    pub fn for_output(kept: impl Into<PathBuf>) -> Self {
        let kept = kept.into();
        Self {
            removed: kept.with_extension("removed.jsonl"),
            report: kept.with_extension("report.json"),
            outcomes: kept.with_extension("outcomes.jsonl"),
            kept,
        }
    }

    /// Default output for an input file: `data.jsonl` gives
    /// `data.filtered.jsonl`.
    pub fn default_for_input(input: impl AsRef<Path>) -> Self {
        Self::for_output(input.as_ref().with_extension("filtered.jsonl"))
    }
}

/// Line counts of a written run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub kept: usize,
    pub removed: usize,
    pub outcomes: usize,
}

/// Writes every artifact of a curation run.
pub fn write_output(paths: &OutputPaths, output: &CurationOutput) -> Result<WriteSummary, CurationError> {
    let kept = write_jsonl(&paths.kept, output.kept_records())?;
    let removed = write_jsonl(&paths.removed, output.removed_records())?;
    let outcomes = write_jsonl(&paths.outcomes, &output.outcomes)?;
    write_json_pretty(&paths.report, &output.report)?;

    info!(
        kept_path = %paths.kept.display(),
        removed_path = %paths.removed.display(),
        kept,
        removed,
        "Saved curation output"
    );

    Ok(WriteSummary {
        kept,
        removed,
        outcomes,
    })
}
