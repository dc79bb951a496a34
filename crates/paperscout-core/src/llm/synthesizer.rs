//! Response synthesis
//!
//! Turns the final ranked result list (and optional source paper) into
//! a cited natural-language answer, streamed or batch. A response is
//! always produced: LLM failure degrades to a deterministic templated
//! summary built from the results.

use super::{ChatMessage, LlmClient};
use crate::config::LLMServiceConfig;
use crate::error::Result;
use crate::search::{PaperMetadata, SearchResult};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Synthesizes natural-language answers from ranked results
pub struct ResponseSynthesizer {
    client: Arc<dyn LlmClient>,
}

impl ResponseSynthesizer {
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

    /// Synthesize a complete answer. Never fails.
    pub async fn synthesize(
        &self,
        query: &str,
        results: &[SearchResult],
        source_paper: Option<&PaperMetadata>,
    ) -> String {
        if results.is_empty() {
            return empty_results_message(source_paper);
        }

        let messages = build_messages(query, results, source_paper);
        match self.client.chat_completion(messages).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("response synthesis failed ({}), using templated summary", e);
                fallback_summary(query, results, source_paper)
            }
        }
    }

    /// Synthesize an answer as a stream of text chunks.
    ///
    /// If the streaming call cannot be established, the templated
    /// summary is emitted as a single chunk; the stream itself never
    /// fails to start.
    pub async fn synthesize_stream(
        &self,
        query: &str,
        results: &[SearchResult],
        source_paper: Option<&PaperMetadata>,
    ) -> BoxStream<'static, Result<String>> {
        if results.is_empty() {
            let message = empty_results_message(source_paper);
            return stream::once(async move { Ok(message) }).boxed();
        }

        let messages = build_messages(query, results, source_paper);
        match self.client.chat_completion_stream(messages).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(
                    "streaming synthesis failed ({}), using templated summary",
                    e
                );
                let fallback = fallback_summary(query, results, source_paper);
                stream::once(async move { Ok(fallback) }).boxed()
            }
        }
    }
}

/// Fixed fast-path messages for an empty result list
fn empty_results_message(source_paper: Option<&PaperMetadata>) -> String {
    match source_paper {
        Some(paper) => format!(
            "I couldn't find any papers similar to **{}** ({}). Try a broader free-text query instead.",
            paper.title, paper.paper_id
        ),
        None => "I couldn't find any papers matching your query. Try rephrasing it or \
                 relaxing the filters."
            .to_string(),
    }
}

fn build_messages(
    query: &str,
    results: &[SearchResult],
    source_paper: Option<&PaperMetadata>,
) -> Vec<ChatMessage> {
    let mut context = String::new();

    if let Some(paper) = source_paper {
        context.push_str(&format!(
            "The user asked about the paper \"{}\" ({}). The papers below are its closest matches in the corpus.\n\n",
            paper.title, paper.paper_id
        ));
    }

    for (i, result) in results.iter().enumerate() {
        context.push_str(&format!(
            "[{}] {} ({}) by {} — score {:.2}\n",
            i + 1,
            result.paper.title,
            result.paper.year.as_deref().unwrap_or("n.d."),
            format_authors(&result.paper.authors),
            result.score,
        ));
        if let Some(ref abstract_text) = result.paper.abstract_text {
            let truncated: String = abstract_text.chars().take(600).collect();
            context.push_str(&format!("    {}\n", truncated));
        }
    }

    vec![
        ChatMessage::system(
            "You are an academic research assistant. Answer the user's question using \
             only the retrieved papers below, citing them as [n]. Be concise and factual; \
             say so when the papers don't cover the question.",
        ),
        ChatMessage::user(format!(
            "Question: {}\n\nRetrieved papers:\n{}",
            query, context
        )),
    ]
}

/// Deterministic summary used when the LLM is unavailable
fn fallback_summary(
    query: &str,
    results: &[SearchResult],
    source_paper: Option<&PaperMetadata>,
) -> String {
    let mut summary = match source_paper {
        Some(paper) => format!(
            "Here are {} papers related to **{}**:\n\n",
            results.len(),
            paper.title
        ),
        None => format!("Here are {} papers matching \"{}\":\n\n", results.len(), query),
    };

    for (i, result) in results.iter().enumerate() {
        summary.push_str(&format!(
            "{}. **{}** ({}) — {} [score {:.2}]\n",
            i + 1,
            result.paper.title,
            result.paper.year.as_deref().unwrap_or("n.d."),
            format_authors(&result.paper.authors),
            result.score,
        ));
    }

    summary
}

fn format_authors(authors: &Option<Vec<String>>) -> String {
    match authors {
        Some(list) if !list.is_empty() => list.join(", "),
        _ => "unknown authors".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaperScoutError;
    use async_trait::async_trait;

    fn paper(id: &str, title: &str) -> PaperMetadata {
        PaperMetadata {
            paper_id: id.to_string(),
            title: title.to_string(),
            abstract_text: Some("An abstract.".to_string()),
            year: Some("2020".to_string()),
            authors: Some(vec!["A. Author".to_string()]),
            pdf_url: None,
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Err(PaperScoutError::Llm("down".to_string()))
        }

        async fn chat_completion_stream(
            &self,
            _messages: Vec<ChatMessage>,
        ) -> Result<BoxStream<'static, Result<String>>> {
            Err(PaperScoutError::Llm("down".to_string()))
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(PaperScoutError::Llm("down".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(PaperScoutError::Llm("down".to_string()))
        }

        fn embedding_dimensions(&self) -> usize {
            0
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_fallback_summary_on_llm_failure() {
        let synthesizer = ResponseSynthesizer::new(Arc::new(FailingClient));
        let results = vec![SearchResult {
            paper: paper("2020.acl-main.1", "A Great Paper"),
            score: 0.91,
        }];

        let response = synthesizer.synthesize("great papers", &results, None).await;
        assert!(response.contains("A Great Paper"));
        assert!(response.contains("2020"));
        assert!(response.contains("0.91"));
    }

    #[tokio::test]
    async fn test_empty_results_messages_differ_by_source() {
        let synthesizer = ResponseSynthesizer::new(Arc::new(FailingClient));

        let plain = synthesizer.synthesize("anything", &[], None).await;
        assert!(plain.contains("matching your query"));

        let source = paper("2020.acl-main.1", "Source Paper");
        let with_source = synthesizer.synthesize("anything", &[], Some(&source)).await;
        assert!(with_source.contains("Source Paper"));
        assert_ne!(plain, with_source);
    }

    #[tokio::test]
    async fn test_stream_degrades_to_single_chunk() {
        let synthesizer = ResponseSynthesizer::new(Arc::new(FailingClient));
        let results = vec![SearchResult {
            paper: paper("w99-0512", "Legacy Paper"),
            score: 0.5,
        }];

        let chunks: Vec<_> = synthesizer
            .synthesize_stream("q", &results, None)
            .await
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].as_ref().unwrap().contains("Legacy Paper"));
    }
}
