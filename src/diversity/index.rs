//! Two-tier duplicate index over accepted records.
//!
//! The exact tier is a hash set keyed by a SHA-256 digest of the normalized
//! question and answer. The near tier keeps a profile of every accepted
//! record, bucketed by comparison size. Once the index holds more than
//! `bucket_cutoff` records, a probe only visits buckets whose size can
//! still reach the threshold (see [`size_window`]); below the cutoff every
//! record is compared. Both paths return the same answer.
//!
//! Insertion order matters: when a probe matches several records the one
//! accepted first is reported.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::pipeline::config::SimilarityConfig;
use crate::quality::RejectReason;
use crate::record::{normalize_text, Record, RecordId};

use super::similarity::{size_window, SimilarityMetric, TextProfile};

/// Default similarity threshold for near duplicates.
const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Default index size below which probes do a full scan.
const DEFAULT_BUCKET_CUTOFF: usize = 64;

/// Separator between question and answer in the exact-tier digest.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Digest identifying a normalized question/answer pair.
pub fn exact_key(normalized_question: &str, normalized_answer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_question.as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(normalized_answer.as_bytes());
    hex::encode(hasher.finalize())
}

/// Text compared by the near tier.
pub fn compared_text(normalized_question: &str, normalized_answer: &str) -> String {
    format!("{} {}", normalized_question, normalized_answer)
}

/// Result of offering a record to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    /// Whether the record was inserted.
    pub accepted: bool,
    /// Earliest accepted record the candidate duplicates.
    pub matched_id: Option<RecordId>,
    /// `DuplicateExact` or `DuplicateNear` when rejected.
    pub reason: Option<RejectReason>,
    /// Similarity to `matched_id`.
    pub similarity: Option<f64>,
}

impl Offer {
    fn accepted() -> Self {
        Self {
            accepted: true,
            matched_id: None,
            reason: None,
            similarity: None,
        }
    }

    fn rejected(reason: RejectReason, matched_id: RecordId, similarity: f64) -> Self {
        Self {
            accepted: false,
            matched_id: Some(matched_id),
            reason: Some(reason),
            similarity: Some(similarity),
        }
    }
}

/// Work counters of the near tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Full similarity computations started.
    pub comparisons: usize,
    /// Accepted records skipped by the size window.
    pub pruned: usize,
    pub exact_hits: usize,
    pub near_hits: usize,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    id: RecordId,
    profile: TextProfile,
}

/// The growing set of accepted records, answering duplicate queries.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    similarity_threshold: f64,
    metric: SimilarityMetric,
    bucket_cutoff: usize,
    exact: HashMap<String, RecordId>,
    ids: HashSet<RecordId>,
    /// Entries in insertion order.
    entries: Vec<IndexEntry>,
    /// Comparison size -> positions in `entries`, ascending.
    by_size: BTreeMap<usize, Vec<usize>>,
    stats: IndexStats,
}

impl Default for SimilarityIndex {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityIndex {
    /// Creates an index with the given threshold and the default metric.
    pub fn new(similarity_threshold: f64) -> Self {
        Self::with_settings(
            similarity_threshold,
            SimilarityMetric::default(),
            DEFAULT_BUCKET_CUTOFF,
        )
    }

    /// Creates an index from a similarity configuration section.
    pub fn from_config(config: &SimilarityConfig) -> Self {
        Self::with_settings(
            config.similarity_threshold,
            config.metric,
            config.bucket_cutoff,
        )
    }

    /// Creates a builder for configuring the index.
    pub fn builder() -> SimilarityIndexBuilder {
        SimilarityIndexBuilder::default()
    }

    fn with_settings(similarity_threshold: f64, metric: SimilarityMetric, bucket_cutoff: usize) -> Self {
        Self {
            similarity_threshold: similarity_threshold.clamp(0.0, 1.0),
            metric,
            bucket_cutoff,
            exact: HashMap::new(),
            ids: HashSet::new(),
            entries: Vec::new(),
            by_size: BTreeMap::new(),
            stats: IndexStats::default(),
        }
    }

    /// Returns the near-duplicate threshold.
    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Returns the similarity metric.
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Number of accepted records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a record with this id was accepted.
    pub fn contains_id(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Returns the work counters.
    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Returns the accepted record with the same normalized text, if any.
    pub fn find_exact(&self, normalized_question: &str, normalized_answer: &str) -> Option<&RecordId> {
        self.exact
            .get(&exact_key(normalized_question, normalized_answer))
    }

    /// Returns the earliest accepted record at or above the threshold, with
    /// its similarity.
    pub fn find_near(
        &mut self,
        normalized_question: &str,
        normalized_answer: &str,
    ) -> Option<(RecordId, f64)> {
        let profile = TextProfile::new(&compared_text(normalized_question, normalized_answer));
        self.probe(&profile)
    }

    /// Normalizes a record and offers it to the index.
    pub fn offer(&mut self, record: &Record) -> Offer {
        let question = normalize_text(&record.question);
        let answer = normalize_text(&record.answer);
        self.offer_normalized(&record.id, &question, &answer)
    }

    /// Inserts the record unless it duplicates an accepted one.
    ///
    /// Exact duplicates are found first. Otherwise the earliest accepted
    /// record with similarity at or above the threshold is reported as a
    /// near duplicate, regardless of which record has the better quality.
    pub fn offer_normalized(
        &mut self,
        id: &RecordId,
        normalized_question: &str,
        normalized_answer: &str,
    ) -> Offer {
        let key = exact_key(normalized_question, normalized_answer);
        if let Some(matched) = self.exact.get(&key) {
            self.stats.exact_hits += 1;
            return Offer::rejected(RejectReason::DuplicateExact, matched.clone(), 1.0);
        }

        let profile = TextProfile::new(&compared_text(normalized_question, normalized_answer));
        if let Some((matched, score)) = self.probe(&profile) {
            self.stats.near_hits += 1;
            return Offer::rejected(RejectReason::DuplicateNear, matched, score);
        }

        self.insert(id.clone(), key, profile);
        Offer::accepted()
    }

    fn insert(&mut self, id: RecordId, key: String, profile: TextProfile) {
        let position = self.entries.len();
        self.by_size
            .entry(profile.size(self.metric))
            .or_default()
            .push(position);
        self.exact.insert(key, id.clone());
        self.ids.insert(id.clone());
        self.entries.push(IndexEntry { id, profile });
    }

    fn probe(&mut self, profile: &TextProfile) -> Option<(RecordId, f64)> {
        let candidates: Vec<usize> = if self.entries.len() <= self.bucket_cutoff {
            (0..self.entries.len()).collect()
        } else {
            let (lower, upper) = size_window(profile.size(self.metric), self.similarity_threshold);
            let mut positions: Vec<usize> = self
                .by_size
                .range(lower..=upper)
                .flat_map(|(_, positions)| positions.iter().copied())
                .collect();
            positions.sort_unstable();
            self.stats.pruned += self.entries.len() - positions.len();
            positions
        };

        for position in candidates {
            let entry = &self.entries[position];
            self.stats.comparisons += 1;
            if let Some(score) =
                profile.similarity_at_least(&entry.profile, self.metric, self.similarity_threshold)
            {
                return Some((entry.id.clone(), score));
            }
        }

        None
    }
}

/// Builder for configuring a SimilarityIndex.
#[derive(Default)]
pub struct SimilarityIndexBuilder {
    similarity_threshold: Option<f64>,
    metric: Option<SimilarityMetric>,
    bucket_cutoff: Option<usize>,
}

impl SimilarityIndexBuilder {
    /// Sets the near-duplicate threshold.
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold.clamp(0.0, 1.0));
        self
    }

    /// Sets the similarity metric.
    pub fn metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Sets the index size below which probes do a full scan.
    pub fn bucket_cutoff(mut self, cutoff: usize) -> Self {
        self.bucket_cutoff = Some(cutoff);
        self
    }

    /// Builds the SimilarityIndex.
    pub fn build(self) -> SimilarityIndex {
        SimilarityIndex::with_settings(
            self.similarity_threshold
                .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
            self.metric.unwrap_or_default(),
            self.bucket_cutoff.unwrap_or(DEFAULT_BUCKET_CUTOFF),
        )
    }
}
