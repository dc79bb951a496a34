//! Integration tests for the end-to-end search pipeline
//!
//! The LLM, the embedding service, and the vector index are replaced
//! with in-memory fakes so every branch of the orchestrator can run
//! hermetically.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use paperscout_core::filters::compiler::{Condition, FilterCompiler, Matcher, Predicate};
use paperscout_core::{
    ChatMessage, Embedder, FilterParser, LlmClient, PaperMetadata, PaperScoutError, QueryKind,
    QuerySearcher, Reformulator, ResponseSynthesizer, ResultAggregator, Result, ScoredCandidate,
    ScrollPage, SearchFilters, SearchMode, SearchPipeline, SearchRequest, StreamEvent,
    VectorStore, YearFilter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn paper(id: &str, title: &str, year: &str) -> PaperMetadata {
    PaperMetadata {
        paper_id: id.to_string(),
        title: title.to_string(),
        abstract_text: Some(format!("Abstract of {}", title)),
        year: Some(year.to_string()),
        authors: Some(vec!["Test Author".to_string()]),
        pdf_url: None,
    }
}

/// Evaluate a compiled predicate against paper metadata, covering the
/// condition shapes the pipeline emits for year and title filters.
fn predicate_matches(predicate: &Predicate, paper: &PaperMetadata) -> bool {
    let field_matches = |cond: &Condition| match cond {
        Condition::Field { key, matcher } => {
            let field = match key.as_str() {
                "year" => paper.year.clone(),
                "title" => Some(paper.title.clone()),
                _ => None,
            };
            match (field, matcher) {
                (Some(v), Matcher::Value { value }) => v == *value,
                (Some(v), Matcher::Text { text }) => {
                    v.to_lowercase().contains(&text.to_lowercase())
                }
                (Some(v), Matcher::Any { any }) => any.contains(&v),
                (None, _) => false,
            }
        }
        // Fake papers carry no awards payload, so it is always empty.
        Condition::IsEmpty { .. } => true,
    };
    predicate.must.iter().all(field_matches) && !predicate.must_not.iter().any(field_matches)
}

struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3, 0.4])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3, 0.4]).collect())
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "fake-embedder"
    }
}

/// In-memory vector store over a fixed corpus. Vector queries return
/// the corpus in a canned order with descending scores; scrolls
/// evaluate the predicate for real.
struct FakeStore {
    corpus: Vec<PaperMetadata>,
    query_calls: AtomicUsize,
}

impl FakeStore {
    fn new(corpus: Vec<PaperMetadata>) -> Self {
        Self {
            corpus,
            query_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn query(
        &self,
        _vector: &[f32],
        predicate: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .corpus
            .iter()
            .filter(|p| predicate.map_or(true, |pred| predicate_matches(pred, p)))
            .take(limit)
            .enumerate()
            .map(|(i, p)| ScoredCandidate {
                paper: p.clone(),
                score: 0.9 - 0.1 * i as f64,
            })
            .collect())
    }

    async fn scroll(&self, predicate: &Predicate, limit: usize) -> Result<Vec<PaperMetadata>> {
        Ok(self
            .corpus
            .iter()
            .filter(|p| predicate_matches(predicate, p))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn scroll_page(
        &self,
        offset: Option<serde_json::Value>,
        limit: usize,
    ) -> Result<ScrollPage> {
        let start = offset.and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let papers: Vec<PaperMetadata> =
            self.corpus.iter().skip(start).take(limit).cloned().collect();
        let next = start + papers.len();
        let next_offset = if next < self.corpus.len() {
            Some(serde_json::json!(next))
        } else {
            None
        };
        Ok(ScrollPage {
            papers,
            next_offset,
        })
    }
}

/// LLM fake that routes on the system prompt: one canned reply per
/// pipeline role, with call recording and an all-failures mode.
struct FakeLlm {
    parse_reply: Option<String>,
    reformulate_reply: Option<String>,
    synthesize_reply: Option<String>,
    fail_all: bool,
    roles_called: Mutex<Vec<String>>,
}

impl FakeLlm {
    fn new() -> Self {
        Self {
            parse_reply: None,
            reformulate_reply: None,
            synthesize_reply: None,
            fail_all: false,
            roles_called: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    fn role_of(messages: &[ChatMessage]) -> &'static str {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        if system.contains("query analyzer") {
            "parse"
        } else if system.contains("query expansion") {
            "reformulate"
        } else if system.contains("research assistant") {
            "synthesize"
        } else {
            "unknown"
        }
    }

    fn roles(&self) -> Vec<String> {
        self.roles_called.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let role = Self::role_of(&messages);
        self.roles_called.lock().unwrap().push(role.to_string());
        if self.fail_all {
            return Err(PaperScoutError::Llm("service unavailable".to_string()));
        }
        let reply = match role {
            "parse" => self.parse_reply.clone(),
            "reformulate" => self.reformulate_reply.clone(),
            "synthesize" => self.synthesize_reply.clone(),
            _ => None,
        };
        reply.ok_or_else(|| PaperScoutError::Llm(format!("no canned reply for {}", role)))
    }

    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let full = self.chat_completion(messages).await?;
        let chunks: Vec<Result<String>> = full
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(PaperScoutError::Embedding("not supported".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(PaperScoutError::Embedding("not supported".to_string()))
    }

    fn embedding_dimensions(&self) -> usize {
        4
    }

    fn model_name(&self) -> &str {
        "fake-llm"
    }
}

fn default_corpus() -> Vec<PaperMetadata> {
    vec![
        paper("2020.acl-main.1", "Attention Is Still All You Need", "2020"),
        paper("2019.emnlp-main.12", "Contextual Embeddings Survey", "2019"),
        paper("2021.naacl-main.7", "Efficient Transformers", "2021"),
        paper("2019.acl-long.44", "Low-Resource Translation", "2019"),
    ]
}

fn build_pipeline(llm: Arc<FakeLlm>, store: Arc<FakeStore>) -> SearchPipeline {
    let client: Arc<dyn LlmClient> = llm;
    SearchPipeline::new(
        FilterParser::new(Arc::clone(&client)),
        FilterCompiler::new(),
        Reformulator::new(Arc::clone(&client), 3),
        QuerySearcher::new(Arc::new(FakeEmbedder), store.clone() as Arc<dyn VectorStore>),
        ResultAggregator::new(60.0, 0.3),
        ResponseSynthesizer::new(client),
        store as Arc<dyn VectorStore>,
        2,
    )
}

fn passthrough_parse_reply(query: &str) -> String {
    format!(
        r#"{{"is_relevant": true, "irrelevant_response": null, "filters": null, "semantic_query": "{}"}}"#,
        query
    )
}

#[tokio::test]
async fn paper_id_query_excludes_source_paper_from_results() {
    let mut llm = FakeLlm::new();
    llm.reformulate_reply = Some(
        r#"{"queries": ["attention mechanisms for sequence models", "transformer self-attention"]}"#
            .to_string(),
    );
    llm.synthesize_reply = Some("These papers build on the source's approach.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm.clone(), store);

    let response = pipeline
        .search(SearchRequest::new("2020.acl-main.1"))
        .await
        .unwrap();

    assert_eq!(response.query_type, QueryKind::PaperId);
    assert_eq!(response.paper_id.as_deref(), Some("2020.acl-main.1"));
    assert_eq!(
        response.source_paper.as_ref().map(|p| p.paper_id.as_str()),
        Some("2020.acl-main.1")
    );
    // The store returns the source paper among the candidates; it
    // must never be reported as similar to itself.
    assert!(!response.results.is_empty());
    assert!(response
        .results
        .iter()
        .all(|r| r.paper.paper_id != "2020.acl-main.1"));
    // No paper_id appears twice.
    let mut ids: Vec<&str> = response.results.iter().map(|r| r.paper.paper_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), response.results.len());
    assert!(!response.reformulated_queries.is_empty());
    assert!(response.timings.search_completed.is_some());
}

#[tokio::test]
async fn uppercase_paper_id_is_normalized_before_lookup() {
    let mut llm = FakeLlm::new();
    llm.reformulate_reply = Some(r#"{"queries": ["related work"]}"#.to_string());
    llm.synthesize_reply = Some("Summary.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm, store);

    let response = pipeline
        .search(SearchRequest::new("2020.ACL-main.1"))
        .await
        .unwrap();
    assert_eq!(response.paper_id.as_deref(), Some("2020.acl-main.1"));
    assert!(response.source_paper.is_some());
}

#[tokio::test]
async fn unknown_paper_id_yields_not_found_terminal_response() {
    let llm = Arc::new(FakeLlm::new());
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm.clone(), store);

    let response = pipeline
        .search(SearchRequest::new("2024.acl-long.999"))
        .await
        .unwrap();

    assert!(response.results.is_empty());
    assert!(response.response.contains("2024.acl-long.999"));
    // Neither reformulation nor synthesis ran.
    assert!(llm.roles().is_empty());
}

#[tokio::test]
async fn paper_without_abstract_yields_not_found_terminal_response() {
    let llm = Arc::new(FakeLlm::new());
    let mut corpus = default_corpus();
    corpus.push(PaperMetadata {
        paper_id: "2022.acl-short.3".to_string(),
        title: "Title-Only Entry".to_string(),
        abstract_text: None,
        year: Some("2022".to_string()),
        authors: None,
        pdf_url: None,
    });
    let store = Arc::new(FakeStore::new(corpus));
    let pipeline = build_pipeline(llm.clone(), store.clone());

    let response = pipeline
        .search(SearchRequest::new("2022.acl-short.3"))
        .await
        .unwrap();

    // Without an abstract there is nothing to reformulate from, so the
    // paper reads the same as an absent one.
    assert!(response.results.is_empty());
    assert!(response.response.contains("2022.acl-short.3"));
    assert!(response.source_paper.is_none());
    assert!(llm.roles().is_empty());
    assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hybrid_degrades_to_filter_only_and_skips_reformulation() {
    let mut llm = FakeLlm::new();
    // The parser consumes the whole query into a year filter.
    llm.parse_reply = Some(
        r#"{"is_relevant": true, "filters": {"year": {"exact": 2019}}, "semantic_query": null}"#
            .to_string(),
    );
    llm.synthesize_reply = Some("Papers from 2019.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm.clone(), store.clone());

    let response = pipeline
        .search(SearchRequest::new("papers from 2019"))
        .await
        .unwrap();

    assert_eq!(response.mode, SearchMode::FilterOnly);
    assert!(response.reformulated_queries.is_empty());
    assert!(response.timings.queries_reformulated.is_none());
    assert!(!llm.roles().contains(&"reformulate".to_string()));
    // No vector search ran, only the payload scroll.
    assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
    // Exactly the 2019 papers, each at the fixed filter-only score.
    assert_eq!(response.results.len(), 2);
    assert!(response.results.iter().all(|r| {
        r.paper.year.as_deref() == Some("2019") && (r.score - 1.0).abs() < f64::EPSILON
    }));
}

#[tokio::test]
async fn hybrid_without_filters_degrades_to_semantic() {
    let mut llm = FakeLlm::new();
    llm.parse_reply = Some(passthrough_parse_reply("transformer architectures"));
    llm.reformulate_reply =
        Some(r#"{"queries": ["self-attention models", "sequence transduction"]}"#.to_string());
    llm.synthesize_reply = Some("Summary of transformer work.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm, store);

    let response = pipeline
        .search(SearchRequest::new("transformer architectures"))
        .await
        .unwrap();

    assert_eq!(response.mode, SearchMode::Semantic);
    assert_eq!(response.query_type, QueryKind::NaturalLanguage);
    // Original query first, then the variants.
    assert_eq!(
        response.reformulated_queries,
        vec![
            "transformer architectures",
            "self-attention models",
            "sequence transduction"
        ]
    );
    assert!(!response.results.is_empty());
}

#[tokio::test]
async fn hybrid_mode_applies_parsed_filters_to_vector_search() {
    let mut llm = FakeLlm::new();
    // The parser splits the query into a year filter plus remaining
    // semantic text, so hybrid stays hybrid.
    llm.parse_reply = Some(
        r#"{"is_relevant": true, "filters": {"year": {"exact": 2019}}, "semantic_query": "machine translation"}"#
            .to_string(),
    );
    llm.reformulate_reply = Some(r#"{"queries": ["low-resource translation"]}"#.to_string());
    llm.synthesize_reply = Some("Translation papers from 2019.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm.clone(), store.clone());

    let response = pipeline
        .search(SearchRequest::new("machine translation papers from 2019"))
        .await
        .unwrap();

    assert_eq!(response.mode, SearchMode::Hybrid);
    assert!(llm.roles().contains(&"reformulate".to_string()));
    // The vector index ran once per reformulated query.
    assert_eq!(
        store.query_calls.load(Ordering::SeqCst),
        response.reformulated_queries.len()
    );
    // The compiled year predicate constrained every vector search.
    assert!(!response.results.is_empty());
    assert!(response
        .results
        .iter()
        .all(|r| r.paper.year.as_deref() == Some("2019")));
}

#[tokio::test]
async fn explicit_year_filter_round_trips_through_compilation() {
    let mut llm = FakeLlm::new();
    llm.synthesize_reply = Some("Papers from 2019.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm, store);

    let request = SearchRequest {
        query: None,
        top_k: 10,
        filters: Some(SearchFilters {
            year: Some(YearFilter::exact(2019)),
            ..Default::default()
        }),
        mode: SearchMode::FilterOnly,
        parse_filters_from_query: false,
    };
    let response = pipeline.search(request).await.unwrap();

    let mut ids: Vec<&str> = response.results.iter().map(|r| r.paper.paper_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["2019.acl-long.44", "2019.emnlp-main.12"]);
}

#[tokio::test]
async fn all_llm_failures_still_produce_a_response() {
    let llm = Arc::new(FakeLlm::failing());
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm, store);

    let response = pipeline
        .search(SearchRequest::new("neural machine translation"))
        .await
        .unwrap();

    // Filter parsing failed open, reformulation degraded to the
    // original query, synthesis fell back to the templated summary.
    assert_eq!(response.mode, SearchMode::Semantic);
    assert!(response.parsed_filters.is_none());
    assert_eq!(
        response.reformulated_queries,
        vec!["neural machine translation"]
    );
    assert!(!response.results.is_empty());
    assert!(!response.response.is_empty());
}

#[tokio::test]
async fn irrelevant_query_short_circuits_before_search() {
    let mut llm = FakeLlm::new();
    llm.parse_reply = Some(
        r#"{"is_relevant": false, "irrelevant_response": "I can only search the paper corpus.", "filters": null, "semantic_query": null}"#
            .to_string(),
    );
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm.clone(), store.clone());

    let response = pipeline
        .search(SearchRequest::new("what's a good pasta recipe?"))
        .await
        .unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.response, "I can only search the paper corpus.");
    assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(llm.roles(), vec!["parse"]);
}

#[tokio::test]
async fn invalid_requests_fail_before_the_pipeline_runs() {
    let llm = Arc::new(FakeLlm::new());
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm.clone(), store.clone());

    let mut request = SearchRequest::new("q");
    request.top_k = 0;
    assert!(matches!(
        pipeline.search(request).await,
        Err(PaperScoutError::InvalidInput(_))
    ));

    let request = SearchRequest {
        query: None,
        top_k: 5,
        filters: None,
        mode: SearchMode::FilterOnly,
        parse_filters_from_query: false,
    };
    assert!(pipeline.search(request).await.is_err());
    assert!(llm.roles().is_empty());
    assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stream_emits_metadata_chunks_then_done() {
    let mut llm = FakeLlm::new();
    llm.parse_reply = Some(passthrough_parse_reply("attention mechanisms"));
    llm.reformulate_reply = Some(r#"{"queries": ["self-attention"]}"#.to_string());
    llm.synthesize_reply = Some("Several papers apply attention.".to_string());
    let llm = Arc::new(llm);
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm, store);

    let events: Vec<StreamEvent> = pipeline
        .search_stream(SearchRequest::new("attention mechanisms"))
        .await
        .unwrap()
        .collect()
        .await;

    assert!(events.len() >= 3);
    let StreamEvent::Metadata(metadata) = &events[0] else {
        panic!("first event must be metadata");
    };
    assert!(!metadata.results.is_empty());
    assert!(metadata.timings.search_completed.is_some());
    assert!(matches!(events.last(), Some(StreamEvent::Done)));

    let body: String = events[1..events.len() - 1]
        .iter()
        .map(|e| match e {
            StreamEvent::Chunk(text) => text.as_str(),
            other => panic!("unexpected event in stream body: {:?}", other),
        })
        .collect();
    assert_eq!(body, "Several papers apply attention.");
}

#[tokio::test]
async fn get_paper_distinguishes_invalid_from_absent() {
    let llm = Arc::new(FakeLlm::new());
    let store = Arc::new(FakeStore::new(default_corpus()));
    let pipeline = build_pipeline(llm, store);

    assert!(matches!(
        pipeline.get_paper("not-an-id").await,
        Err(PaperScoutError::InvalidInput(_))
    ));
    assert!(matches!(
        pipeline.get_paper("2024.acl-long.999").await,
        Err(PaperScoutError::PaperNotFound(_))
    ));
    let paper = pipeline.get_paper("W99-0512").await;
    assert!(matches!(paper, Err(PaperScoutError::PaperNotFound(_))));

    let found = pipeline.get_paper("2020.acl-main.1").await.unwrap();
    assert_eq!(found.title, "Attention Is Still All You Need");
}
