//! Per-query embedding + vector search

use super::ScoredCandidate;
use crate::error::Result;
use crate::filters::compiler::Predicate;
use crate::llm::Embedder;
use crate::store::VectorStore;
use std::sync::Arc;

/// Executes individual vector searches against the corpus
pub struct QuerySearcher {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl QuerySearcher {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Embed one query and run a single similarity search.
    /// Similarity scores are clamped to [0, 1]; never a distance.
    pub async fn search_one(
        &self,
        query: &str,
        top_k: usize,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<ScoredCandidate>> {
        let vector = self.embedder.embed(query).await?;
        let mut candidates = self.store.query(&vector, predicate, top_k).await?;
        for candidate in &mut candidates {
            candidate.score = candidate.score.clamp(0.0, 1.0);
        }
        Ok(candidates)
    }

    /// Run several searches sequentially, one inner list per query.
    ///
    /// Sequential because the embedding backend makes no concurrency
    /// guarantee. Queries that fail are logged and dropped from the
    /// output rather than failing the batch.
    pub async fn search_many(
        &self,
        queries: &[String],
        top_k: usize,
        predicate: Option<&Predicate>,
    ) -> Vec<Vec<ScoredCandidate>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            match self.search_one(query, top_k, predicate).await {
                Ok(candidates) => results.push(candidates),
                Err(e) => {
                    tracing::error!("search failed for query '{}': {}", query, e);
                }
            }
        }
        results
    }

    /// Predicate-only scan. No semantic ranking applies, so every
    /// candidate carries a fixed score of 1.0.
    pub async fn search_filter_only(
        &self,
        predicate: &Predicate,
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        let papers = self.store.scroll(predicate, top_k).await?;
        Ok(papers
            .into_iter()
            .map(|paper| ScoredCandidate { paper, score: 1.0 })
            .collect())
    }
}
