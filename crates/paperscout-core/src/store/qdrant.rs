//! Qdrant REST client
//!
//! Speaks to the `points/query` and `points/scroll` endpoints of a
//! Qdrant collection holding the paper corpus. Payload fields are
//! flat: paper_id, title, abstract, year (string), authors, pdf_url.

use super::{ScrollPage, VectorStore};
use crate::config::VectorIndexConfig;
use crate::error::{PaperScoutError, Result};
use crate::filters::compiler::Predicate;
use crate::search::{PaperMetadata, ScoredCandidate};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Qdrant-backed vector store
pub struct QdrantStore {
    http_client: reqwest::Client,
    config: VectorIndexConfig,
}

impl QdrantStore {
    /// Create new store from configuration
    pub fn new(config: VectorIndexConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PaperScoutError::Http)?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(VectorIndexConfig::default())
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let url = format!(
            "{}/collections/{}/points/{}",
            self.config.url, self.config.collection, endpoint
        );

        let mut req = self.http_client.post(&url).json(&body);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("api-key", api_key);
        }

        let response = req.send().await.map_err(PaperScoutError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PaperScoutError::ExternalError(format!(
                "vector index error (HTTP {}): {}",
                status, body
            )));
        }

        response.json().await.map_err(PaperScoutError::Http)
    }
}

/// Build a PaperMetadata from a point payload
fn paper_from_payload(payload: &Value) -> PaperMetadata {
    PaperMetadata {
        paper_id: payload["paper_id"].as_str().unwrap_or_default().to_string(),
        title: payload["title"].as_str().unwrap_or_default().to_string(),
        abstract_text: payload["abstract"].as_str().map(String::from),
        year: payload["year"].as_str().map(String::from),
        authors: payload["authors"].as_array().map(|array| {
            array
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        }),
        pdf_url: payload["pdf_url"].as_str().map(String::from),
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn query(
        &self,
        vector: &[f32],
        predicate: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(predicate) = predicate {
            body["filter"] = serde_json::to_value(predicate)?;
        }

        let response = self.post("query", body).await?;

        let points = response["result"]["points"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let candidates = points
            .iter()
            .map(|point| {
                // Cosine similarity from the index; clamp to [0, 1]
                let score = point["score"].as_f64().unwrap_or(0.0).clamp(0.0, 1.0);
                ScoredCandidate {
                    paper: paper_from_payload(&point["payload"]),
                    score,
                }
            })
            .collect();

        Ok(candidates)
    }

    async fn scroll(&self, predicate: &Predicate, limit: usize) -> Result<Vec<PaperMetadata>> {
        let body = json!({
            "filter": serde_json::to_value(predicate)?,
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });

        let response = self.post("scroll", body).await?;

        let points = response["result"]["points"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(points
            .iter()
            .map(|point| paper_from_payload(&point["payload"]))
            .collect())
    }

    async fn scroll_page(
        &self,
        offset: Option<Value>,
        limit: usize,
    ) -> Result<ScrollPage> {
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });
        if let Some(offset) = offset {
            body["offset"] = offset;
        }

        let response = self.post("scroll", body).await?;

        let papers = response["result"]["points"]
            .as_array()
            .map(|points| {
                points
                    .iter()
                    .map(|point| paper_from_payload(&point["payload"]))
                    .collect()
            })
            .unwrap_or_default();

        let next_offset = match &response["result"]["next_page_offset"] {
            Value::Null => None,
            value => Some(value.clone()),
        };

        Ok(ScrollPage {
            papers,
            next_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_from_payload() {
        let payload = json!({
            "paper_id": "2020.acl-main.1",
            "title": "A Paper",
            "abstract": "Text.",
            "year": "2020",
            "authors": ["A. Author", "B. Author"],
            "pdf_url": "https://example.org/p.pdf",
        });

        let paper = paper_from_payload(&payload);
        assert_eq!(paper.paper_id, "2020.acl-main.1");
        assert_eq!(paper.year.as_deref(), Some("2020"));
        assert_eq!(paper.authors.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_paper_from_sparse_payload() {
        let payload = json!({"paper_id": "w99-0512", "title": "Old Paper"});
        let paper = paper_from_payload(&payload);
        assert!(paper.abstract_text.is_none());
        assert!(paper.year.is_none());
        assert!(paper.authors.is_none());
    }
}
