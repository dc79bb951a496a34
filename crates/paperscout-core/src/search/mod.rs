//! Search types and ranking
//!
//! Provides:
//! - Paper metadata and candidate/result types
//! - Per-query embedding + vector search
//! - Hybrid RRF + raw-score fusion with deduplication

pub mod aggregator;
pub mod searcher;

pub use aggregator::ResultAggregator;
pub use searcher::QuerySearcher;

use serde::{Deserialize, Serialize};

/// Metadata for a single paper in the corpus.
///
/// Read-only reference data; the pipeline never mutates it. Year is
/// kept as a string because that is how the index stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PaperMetadata {
    pub paper_id: String,
    pub title: String,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

/// A candidate produced by one per-query search, with its similarity
/// score clamped to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub paper: PaperMetadata,
    pub score: f64,
}

/// A post-aggregation result: one per unique paper_id, fused score in
/// [0, 1], ordered by descending score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub paper: PaperMetadata,
    pub score: f64,
}
