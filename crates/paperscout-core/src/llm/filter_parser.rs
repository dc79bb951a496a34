//! LLM-based filter extraction from natural language queries
//!
//! Sends the query to the LLM with a structured-extraction prompt and
//! parses the response into typed filters plus the remaining semantic
//! intent. Fails open: any client error or malformed output degrades
//! to an unfiltered semantic search of the original query.

use super::{ChatMessage, LlmClient};
use crate::config::LLMServiceConfig;
use crate::error::Result;
use crate::filters::{SearchFilters, YearFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of parsing a query for filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Extracted filters, if any
    pub filters: Option<SearchFilters>,
    /// Query text stripped of filter language; None when the filters
    /// fully consumed the query intent
    pub semantic_query: Option<String>,
    /// False when the query is unrelated to the paper corpus
    pub is_relevant: bool,
    /// Rejection message for irrelevant queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irrelevant_response: Option<String>,
}

impl ParsedQuery {
    /// Fail-open fallback: no filters, original query, assumed relevant
    fn passthrough(query: &str) -> Self {
        Self {
            filters: None,
            semantic_query: Some(query.to_string()),
            is_relevant: true,
            irrelevant_response: None,
        }
    }
}

const DEFAULT_IRRELEVANT_RESPONSE: &str = "I'm an academic paper search assistant for \
     computational linguistics and NLP research. I can help you find papers, explore \
     research topics, discover authors' work, and more. Please ask me about NLP, \
     machine learning, or computational linguistics papers!";

/// Parses natural language queries into structured filters using an LLM
pub struct FilterParser {
    client: Arc<dyn LlmClient>,
}

impl FilterParser {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Create from configuration
    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        let client = super::OpenAiClient::new(config)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Parse a natural language query into filters and semantic intent.
    ///
    /// Never fails: LLM errors and malformed output fall back to the
    /// original query with no filters.
    pub async fn parse(&self, query: &str) -> ParsedQuery {
        let current_year = chrono::Datelike::year(&chrono::Utc::now());
        let prompt = build_extraction_prompt(query, current_year);

        let messages = vec![
            ChatMessage::system(
                "You are a search query analyzer for an academic paper corpus. \
                 Extract structured filters from user queries. Output ONLY valid JSON with \
                 these fields: is_relevant (bool), irrelevant_response (string or null), \
                 filters (object or null), semantic_query (string or null)",
            ),
            ChatMessage::user(prompt),
        ];

        let response = match self.client.chat_completion(messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("filter extraction failed ({}), returning original query", e);
                return ParsedQuery::passthrough(query);
            }
        };

        parse_extraction_response(&response, query)
    }
}

fn build_extraction_prompt(query: &str, current_year: i32) -> String {
    format!(
        r#"Analyze this search query against an academic NLP paper corpus:

Query: "{query}"
Current year: {current_year}

First decide relevance: is the query about research papers, NLP, machine learning,
computational linguistics, or their authors/venues? If not, set is_relevant to false
and write a short polite irrelevant_response.

For relevant queries, extract filters:
- year: {{"exact": N}} or {{"min_year": N, "max_year": N}} (resolve relative terms like
  "recent" or "last 5 years" against the current year) or null
- bibkey: exact bibliography key or null
- title_keywords: words required in the title (array) or null
- language: ISO language code or null
- authors: author name fragments (array) or null
- has_awards: true if the user asks for award-winning papers, else null
- awards: specific award names (array) or null

Set semantic_query to the query text with filter language removed. If the filters fully
capture the intent, set semantic_query to null.

Examples:
Input: "transformer papers by Vaswani from 2017"
Output: {{"is_relevant": true, "irrelevant_response": null, "filters": {{"year": {{"exact": 2017}}, "authors": ["Vaswani"]}}, "semantic_query": "transformer papers"}}

Input: "best paper award winners in machine translation since 2020"
Output: {{"is_relevant": true, "irrelevant_response": null, "filters": {{"year": {{"min_year": 2020, "max_year": {current_year}}}, "has_awards": true}}, "semantic_query": "machine translation"}}

Input: "what's a good pasta recipe?"
Output: {{"is_relevant": false, "irrelevant_response": "I can only help with academic NLP papers.", "filters": null, "semantic_query": null}}

Now analyze the query above. Output only JSON:"#
    )
}

fn parse_extraction_response(response: &str, original_query: &str) -> ParsedQuery {
    let Some(json_str) = super::client::extract_json_object(response) else {
        tracing::warn!("no JSON in filter extraction response, returning original query");
        return ParsedQuery::passthrough(original_query);
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse filter JSON: {}, returning original query", e);
            return ParsedQuery::passthrough(original_query);
        }
    };

    // Relevance gate comes first
    let is_relevant = parsed["is_relevant"].as_bool().unwrap_or(true);
    if !is_relevant {
        let irrelevant_response = parsed["irrelevant_response"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_IRRELEVANT_RESPONSE)
            .to_string();
        return ParsedQuery {
            filters: None,
            semantic_query: None,
            is_relevant: false,
            irrelevant_response: Some(irrelevant_response),
        };
    }

    let filters = parse_filters(&parsed["filters"]);

    // Blank semantic queries mean the filters consumed the intent
    let semantic_query = parsed["semantic_query"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    ParsedQuery {
        filters,
        semantic_query,
        is_relevant: true,
        irrelevant_response: None,
    }
}

fn parse_filters(value: &serde_json::Value) -> Option<SearchFilters> {
    if !value.is_object() {
        return None;
    }

    let filters = SearchFilters {
        year: parse_year_filter(&value["year"]),
        bibkey: value["bibkey"].as_str().map(String::from),
        title_keywords: parse_string_list(&value["title_keywords"]),
        language: value["language"].as_str().map(String::from),
        authors: parse_string_list(&value["authors"]),
        has_awards: if value["has_awards"].as_bool() == Some(true) {
            Some(true)
        } else {
            None
        },
        awards: parse_string_list(&value["awards"]),
    };

    if filters.is_empty() {
        None
    } else {
        Some(filters)
    }
}

fn parse_year_filter(value: &serde_json::Value) -> Option<YearFilter> {
    if !value.is_object() {
        return None;
    }

    let exact = coerce_year(&value["exact"]);
    let min_year = coerce_year(&value["min_year"]);
    let max_year = coerce_year(&value["max_year"]);

    if let Some(exact) = exact {
        return Some(YearFilter::exact(exact));
    }

    if min_year.is_none() && max_year.is_none() {
        return None;
    }

    match YearFilter::range(min_year, max_year) {
        Ok(filter) => Some(filter),
        Err(e) => {
            tracing::warn!("rejecting year filter: {}", e);
            None
        }
    }
}

/// Coerce a year to an integer; strings like "2020" are accepted,
/// anything non-coercible is discarded.
fn coerce_year(value: &serde_json::Value) -> Option<i32> {
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok();
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}

/// Read a list field, coercing an accidental singular value into a
/// one-element list.
fn parse_string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    if let Some(array) = value.as_array() {
        let items: Vec<String> = array
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        return if items.is_empty() { None } else { Some(items) };
    }
    value.as_str().map(|s| vec![s.to_string()])
}
