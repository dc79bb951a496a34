//! Hybrid rank fusion over per-query result lists
//!
//! Combines reciprocal rank fusion with raw similarity scores so that
//! a paper ranked highly by several reformulations outranks one that
//! appears once with a marginally better raw score, while raw scores
//! still break up pure rank ties.

use super::{ScoredCandidate, SearchResult};
use std::collections::HashMap;

/// Fuses result lists from multiple query variants into one ranking
pub struct ResultAggregator {
    rrf_k: f64,
    score_weight: f64,
}

impl ResultAggregator {
    pub fn new(rrf_k: f64, score_weight: f64) -> Self {
        Self {
            rrf_k,
            score_weight,
        }
    }

    /// Deduplicate a single result list: keep the best score per
    /// paper, sort descending, ties broken by ascending paper id.
    pub fn deduplicate_simple(
        &self,
        candidates: Vec<ScoredCandidate>,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let mut best: HashMap<String, ScoredCandidate> = HashMap::new();
        for candidate in candidates {
            match best.get(&candidate.paper.paper_id) {
                Some(existing) if existing.score >= candidate.score => {}
                _ => {
                    best.insert(candidate.paper.paper_id.clone(), candidate);
                }
            }
        }
        let mut results: Vec<SearchResult> = best
            .into_values()
            .map(|c| SearchResult {
                paper: c.paper,
                score: c.score,
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.paper.paper_id.cmp(&b.paper.paper_id))
        });
        results.truncate(top_k);
        results
    }

    /// Fuse multiple ranked lists into a single top-k ranking.
    ///
    /// Each paper accumulates an RRF contribution of `1 / (K + rank)`
    /// (1-based rank) per list it appears in, plus the mean of its raw
    /// scores. The RRF sum is normalized against the best possible
    /// value `num_lists / (K + 1)`, then blended:
    ///
    /// `final = w * avg_raw + (1 - w) * normalized_rrf`
    ///
    /// Final scores are clamped to [0, 1]. Ties break by ascending
    /// paper id so the ranking is deterministic across runs.
    pub fn aggregate(
        &self,
        lists: Vec<Vec<ScoredCandidate>>,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let num_lists = lists.len();
        if num_lists == 0 {
            return Vec::new();
        }

        struct Entry {
            candidate: ScoredCandidate,
            rrf_sum: f64,
            raw_scores: Vec<f64>,
        }

        let mut entries: HashMap<String, Entry> = HashMap::new();
        for list in lists {
            for (rank, candidate) in list.into_iter().enumerate() {
                let contribution = 1.0 / (self.rrf_k + (rank + 1) as f64);
                let raw = candidate.score;
                entries
                    .entry(candidate.paper.paper_id.clone())
                    .and_modify(|entry| {
                        entry.rrf_sum += contribution;
                        entry.raw_scores.push(raw);
                        // Later lists refresh the metadata snapshot.
                        entry.candidate = candidate.clone();
                    })
                    .or_insert_with(|| Entry {
                        candidate,
                        rrf_sum: contribution,
                        raw_scores: vec![raw],
                    });
            }
        }

        let max_rrf = num_lists as f64 / (self.rrf_k + 1.0);
        let mut results: Vec<SearchResult> = entries
            .into_values()
            .map(|entry| {
                let avg_raw =
                    entry.raw_scores.iter().sum::<f64>() / entry.raw_scores.len() as f64;
                let normalized_rrf = if max_rrf > 0.0 {
                    entry.rrf_sum / max_rrf
                } else {
                    0.0
                };
                let score = (self.score_weight * avg_raw
                    + (1.0 - self.score_weight) * normalized_rrf)
                    .clamp(0.0, 1.0);
                SearchResult {
                    paper: entry.candidate.paper,
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.paper.paper_id.cmp(&b.paper.paper_id))
        });
        results.truncate(top_k);
        results
    }
}
