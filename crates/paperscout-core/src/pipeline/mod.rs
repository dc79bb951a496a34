//! End-to-end search pipeline
//!
//! Request/response types plus the orchestrator that sequences
//! classification, filter parsing, reformulation, per-query search,
//! aggregation, and response synthesis.

mod orchestrator;

pub use orchestrator::SearchPipeline;

use crate::error::{PaperScoutError, Result};
use crate::filters::SearchFilters;
use crate::query::QueryKind;
use crate::search::{PaperMetadata, SearchResult};
use serde::{Deserialize, Serialize};

pub const MAX_QUERY_LENGTH: usize = 1000;
pub const MAX_TOP_K: usize = 20;
pub const DEFAULT_TOP_K: usize = 5;

/// How retrieval combines structured filters and vector similarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    FilterOnly,
    Hybrid,
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Hybrid
    }
}

/// A search request. Immutable once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_true")]
    pub parse_filters_from_query: bool,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_true() -> bool {
    true
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            top_k: DEFAULT_TOP_K,
            filters: None,
            mode: SearchMode::Hybrid,
            parse_filters_from_query: true,
        }
    }

    /// Validate the request before any pipeline work runs.
    pub fn validate(&self) -> Result<()> {
        if self.top_k < 1 || self.top_k > MAX_TOP_K {
            return Err(PaperScoutError::InvalidInput(format!(
                "top_k must be between 1 and {}",
                MAX_TOP_K
            )));
        }
        if let Some(query) = &self.query {
            if query.chars().count() > MAX_QUERY_LENGTH {
                return Err(PaperScoutError::InvalidInput(format!(
                    "query exceeds {} characters",
                    MAX_QUERY_LENGTH
                )));
            }
        }
        let has_query = self
            .query
            .as_deref()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false);
        match self.mode {
            SearchMode::Semantic | SearchMode::Hybrid => {
                if !has_query {
                    return Err(PaperScoutError::InvalidInput(
                        "semantic and hybrid modes require a non-empty query".to_string(),
                    ));
                }
            }
            SearchMode::FilterOnly => {
                let has_filters = self.filters.as_ref().map(|f| !f.is_empty()).unwrap_or(false);
                if !has_filters {
                    return Err(PaperScoutError::InvalidInput(
                        "filter_only mode requires a non-empty filter set".to_string(),
                    ));
                }
            }
        }
        if let Some(filters) = &self.filters {
            filters.validate()?;
        }
        Ok(())
    }
}

/// Epoch-millisecond timestamps for each completed pipeline stage.
/// A stage left at None never ran on the path that produced the
/// response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineTimings {
    pub start: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters_parsed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries_reformulated: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_completed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_generated: Option<u64>,
}

pub(crate) fn epoch_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// The full response envelope. Every terminal path, degraded or not,
/// populates the same structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query_type: QueryKind,
    pub original_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_paper: Option<PaperMetadata>,
    pub results: Vec<SearchResult>,
    pub response: String,
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_query: Option<String>,
    pub reformulated_queries: Vec<String>,
    pub timings: PipelineTimings,
}

/// Metadata emitted as the first event of a streamed response:
/// everything in [`SearchResponse`] except the synthesized text,
/// which follows as chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub query_type: QueryKind,
    pub original_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_paper: Option<PaperMetadata>,
    pub results: Vec<SearchResult>,
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_query: Option<String>,
    pub reformulated_queries: Vec<String>,
    pub timings: PipelineTimings,
}

/// Events of a streamed response, in order: one Metadata, zero or
/// more Chunks (or one Error in their place), one Done.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Metadata(Box<StreamMetadata>),
    Chunk(String),
    Error(String),
    Done,
}
