//! Vector index access
//!
//! The index is an opaque similarity-search service reached through
//! the [`VectorStore`] trait: vector query, filtered scroll, and a
//! paged full scan used for ID lookup. The production implementation
//! talks to the Qdrant REST API.

mod qdrant;

pub use qdrant::QdrantStore;

use crate::error::Result;
use crate::filters::compiler::Predicate;
use crate::search::{PaperMetadata, ScoredCandidate};
use async_trait::async_trait;

/// One page of a full corpus scan
#[derive(Debug, Clone)]
pub struct ScrollPage {
    pub papers: Vec<PaperMetadata>,
    /// Opaque continuation token; None when the scan is exhausted
    pub next_offset: Option<serde_json::Value>,
}

/// Similarity-search contract over the paper corpus
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Vector similarity search, optionally constrained by a predicate.
    /// Candidates come back ranked by descending similarity.
    async fn query(
        &self,
        vector: &[f32],
        predicate: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>>;

    /// Predicate-only scan, no vector ranking
    async fn scroll(&self, predicate: &Predicate, limit: usize) -> Result<Vec<PaperMetadata>>;

    /// One page of an unfiltered corpus scan (for ID lookup)
    async fn scroll_page(
        &self,
        offset: Option<serde_json::Value>,
        limit: usize,
    ) -> Result<ScrollPage>;
}
