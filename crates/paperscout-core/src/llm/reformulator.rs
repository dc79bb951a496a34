//! LLM-based query reformulation
//!
//! Expands one semantic query into several alternate phrasings before
//! vector search. A single embedding of the raw query underperforms an
//! ensemble of paraphrases when vocabulary differs between the query
//! and the abstracts, so widening here buys recall cheaply.

use super::{ChatMessage, LlmClient};
use crate::config::{LLMServiceConfig, RetrievalConfig};
use crate::error::Result;
use std::sync::Arc;

/// Query reformulator using an LLM
pub struct Reformulator {
    client: Arc<dyn LlmClient>,
    num_queries: usize,
}

impl Reformulator {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LlmClient>, num_queries: usize) -> Self {
        Self {
            client,
            num_queries,
        }
    }

    /// Create from configuration
    pub fn from_config(llm: LLMServiceConfig, retrieval: &RetrievalConfig) -> Result<Self> {
        let client = super::OpenAiClient::new(llm)?;
        Ok(Self {
            client: Arc::new(client),
            num_queries: retrieval.num_reformulations,
        })
    }

    /// Expand a free-text query into search queries.
    ///
    /// The original query is always the first element; up to
    /// `num_queries` LLM variants follow. On any LLM failure the
    /// original query alone is returned.
    pub async fn reformulate(&self, query: &str) -> Vec<String> {
        let prompt = build_query_prompt(query, self.num_queries);
        let variants = self.request_variants(prompt).await;

        let mut queries = vec![query.to_string()];
        queries.extend(
            variants
                .into_iter()
                .filter(|v| v.trim() != query.trim())
                .take(self.num_queries),
        );
        queries
    }

    /// Derive search queries from a source paper's title and abstract.
    ///
    /// There is no free-text query in this path, so nothing is
    /// prepended. On failure the title alone is returned.
    pub async fn reformulate_from_paper(&self, title: &str, abstract_text: &str) -> Vec<String> {
        let prompt = build_paper_prompt(title, abstract_text, self.num_queries);
        let variants = self.request_variants(prompt).await;

        if variants.is_empty() {
            return vec![title.to_string()];
        }
        variants.into_iter().take(self.num_queries).collect()
    }

    async fn request_variants(&self, prompt: String) -> Vec<String> {
        let messages = vec![
            ChatMessage::system(
                "You are a search query expansion expert for an academic paper corpus. \
                 Generate query variations to improve retrieval recall. \
                 Output ONLY valid JSON with one field: queries (array of strings)",
            ),
            ChatMessage::user(prompt),
        ];

        match self.client.chat_completion(messages).await {
            Ok(response) => parse_variants_response(&response),
            Err(e) => {
                tracing::warn!("query reformulation failed ({}), degrading to single query", e);
                Vec::new()
            }
        }
    }
}

fn build_query_prompt(query: &str, n: usize) -> String {
    format!(
        r#"Reformulate this search query into {n} alternate phrasings:

Query: "{query}"

Each phrasing should capture a different facet or vocabulary of the same
information need, suitable for dense retrieval over paper abstracts.

Example:
Input: "low resource machine translation"
Output: {{"queries": ["translation systems for low-resource languages", "MT with limited parallel data", "cross-lingual transfer for scarce-data translation"]}}

Now reformulate the query above. Output only JSON:"#
    )
}

fn build_paper_prompt(title: &str, abstract_text: &str, n: usize) -> String {
    format!(
        r#"Given this paper, write {n} search queries that would retrieve closely related work:

Title: {title}
Abstract: {abstract_text}

Queries should target the paper's methods, task, and findings without
quoting the title verbatim.

Output only JSON: {{"queries": ["...", "..."]}}"#
    )
}

fn parse_variants_response(response: &str) -> Vec<String> {
    let Some(json_str) = super::client::extract_json_object(response) else {
        tracing::warn!("no JSON in reformulation response");
        return Vec::new();
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse reformulation JSON: {}", e);
            return Vec::new();
        }
    };

    parsed["queries"]
        .as_array()
        .map(|array| {
            array
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
