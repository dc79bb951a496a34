//! Pipeline orchestrator
//!
//! Sequences classification, filter parsing, mode resolution,
//! reformulation, per-query search, aggregation, and synthesis.
//! Every terminal path, degraded or not, produces the same response
//! envelope so latency analysis has uniform structure.

use super::{
    epoch_millis, PipelineTimings, SearchMode, SearchRequest, SearchResponse, StreamEvent,
    StreamMetadata,
};
use crate::config::Config;
use crate::error::{PaperScoutError, Result};
use crate::filters::compiler::{FilterCompiler, Predicate};
use crate::filters::{merge_filters, SearchFilters};
use crate::llm::{
    FilterParser, HttpEmbedder, OpenAiClient, Reformulator, ResponseSynthesizer,
};
use crate::query::{classify, is_valid_paper_id, normalize_paper_id, QueryKind};
use crate::search::{PaperMetadata, QuerySearcher, ResultAggregator, SearchResult};
use crate::store::{QdrantStore, VectorStore};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Page size for the full-corpus scan used by ID lookup
const SCROLL_PAGE_SIZE: usize = 100;

/// The end-to-end search pipeline.
///
/// Components are constructed once and shared read-only across
/// requests; all per-request state lives in locals.
pub struct SearchPipeline {
    filter_parser: FilterParser,
    filter_compiler: FilterCompiler,
    reformulator: Reformulator,
    searcher: QuerySearcher,
    aggregator: ResultAggregator,
    synthesizer: ResponseSynthesizer,
    store: Arc<dyn VectorStore>,
    search_k_multiplier: usize,
}

/// Everything retrieval produces before synthesis runs. Shared by the
/// batch and streaming entry points.
struct PreparedSearch {
    query_type: QueryKind,
    original_query: String,
    paper_id: Option<String>,
    source_paper: Option<PaperMetadata>,
    results: Vec<SearchResult>,
    mode: SearchMode,
    parsed_filters: Option<SearchFilters>,
    applied_filters: Option<SearchFilters>,
    semantic_query: Option<String>,
    reformulated_queries: Vec<String>,
    timings: PipelineTimings,
    /// Set on short-circuit paths; skips synthesis entirely
    canned_response: Option<String>,
}

impl PreparedSearch {
    fn new(query_type: QueryKind, original_query: String, mode: SearchMode) -> Self {
        Self {
            query_type,
            original_query,
            paper_id: None,
            source_paper: None,
            results: Vec::new(),
            mode,
            parsed_filters: None,
            applied_filters: None,
            semantic_query: None,
            reformulated_queries: Vec::new(),
            timings: PipelineTimings {
                start: epoch_millis(),
                ..Default::default()
            },
            canned_response: None,
        }
    }

    fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            query_type: self.query_type,
            original_query: self.original_query.clone(),
            paper_id: self.paper_id.clone(),
            source_paper: self.source_paper.clone(),
            results: self.results.clone(),
            mode: self.mode,
            parsed_filters: self.parsed_filters.clone(),
            applied_filters: self.applied_filters.clone(),
            semantic_query: self.semantic_query.clone(),
            reformulated_queries: self.reformulated_queries.clone(),
            timings: self.timings.clone(),
        }
    }

    fn into_response(self, response: String, generated_at: Option<u64>) -> SearchResponse {
        let mut timings = self.timings;
        timings.response_generated = generated_at;
        SearchResponse {
            query_type: self.query_type,
            original_query: self.original_query,
            paper_id: self.paper_id,
            source_paper: self.source_paper,
            results: self.results,
            response,
            mode: self.mode,
            parsed_filters: self.parsed_filters,
            applied_filters: self.applied_filters,
            semantic_query: self.semantic_query,
            reformulated_queries: self.reformulated_queries,
            timings,
        }
    }
}

impl SearchPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filter_parser: FilterParser,
        filter_compiler: FilterCompiler,
        reformulator: Reformulator,
        searcher: QuerySearcher,
        aggregator: ResultAggregator,
        synthesizer: ResponseSynthesizer,
        store: Arc<dyn VectorStore>,
        search_k_multiplier: usize,
    ) -> Self {
        Self {
            filter_parser,
            filter_compiler,
            reformulator,
            searcher,
            aggregator,
            synthesizer,
            store,
            search_k_multiplier: search_k_multiplier.max(1),
        }
    }

    /// Wire the pipeline from configuration: one shared LLM client,
    /// an HTTP embedder, and a Qdrant-backed store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client: Arc<dyn crate::llm::LlmClient> =
            Arc::new(OpenAiClient::new(config.llm_service.clone())?);
        let embedder = Arc::new(HttpEmbedder::new(Arc::clone(&client)));
        let store: Arc<dyn VectorStore> =
            Arc::new(QdrantStore::new(config.vector_index.clone())?);
        Ok(Self {
            filter_parser: FilterParser::new(Arc::clone(&client)),
            filter_compiler: FilterCompiler::new(),
            reformulator: Reformulator::new(
                Arc::clone(&client),
                config.retrieval.num_reformulations,
            ),
            searcher: QuerySearcher::new(embedder, Arc::clone(&store)),
            aggregator: ResultAggregator::new(
                config.retrieval.rrf_k,
                config.retrieval.score_weight,
            ),
            synthesizer: ResponseSynthesizer::new(client),
            store,
            search_k_multiplier: config.retrieval.search_k_multiplier.max(1),
        })
    }

    /// Run the full pipeline and return a complete response.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let mut prepared = self.prepare(request).await?;
        if let Some(canned) = prepared.canned_response.take() {
            return Ok(prepared.into_response(canned, None));
        }
        let response = self
            .synthesizer
            .synthesize(
                &prepared.original_query,
                &prepared.results,
                prepared.source_paper.as_ref(),
            )
            .await;
        Ok(prepared.into_response(response, Some(epoch_millis())))
    }

    /// Run retrieval eagerly, then stream the synthesized answer:
    /// one metadata event, then text chunks (or one error event),
    /// then a terminal done event.
    pub async fn search_stream(
        &self,
        request: SearchRequest,
    ) -> Result<BoxStream<'static, StreamEvent>> {
        let mut prepared = self.prepare(request).await?;
        let metadata = StreamEvent::Metadata(Box::new(prepared.metadata()));

        if let Some(canned) = prepared.canned_response.take() {
            let events = vec![metadata, StreamEvent::Chunk(canned), StreamEvent::Done];
            return Ok(stream::iter(events).boxed());
        }

        let chunks = self
            .synthesizer
            .synthesize_stream(
                &prepared.original_query,
                &prepared.results,
                prepared.source_paper.as_ref(),
            )
            .await;

        let body = chunks
            .map(|chunk| match chunk {
                Ok(text) => StreamEvent::Chunk(text),
                Err(e) => StreamEvent::Error(e.to_string()),
            })
            // An error event replaces all further chunks.
            .scan(false, |errored, event| {
                if *errored {
                    return futures::future::ready(None);
                }
                if matches!(event, StreamEvent::Error(_)) {
                    *errored = true;
                }
                futures::future::ready(Some(event))
            });

        Ok(stream::once(async move { metadata })
            .chain(body)
            .chain(stream::once(async { StreamEvent::Done }))
            .boxed())
    }

    /// Look up a paper by ID. Invalid grammar is a client error;
    /// well-formed but absent is not-found.
    pub async fn get_paper(&self, paper_id: &str) -> Result<PaperMetadata> {
        if !is_valid_paper_id(paper_id) {
            return Err(PaperScoutError::InvalidInput(format!(
                "'{}' is not a valid paper ID",
                paper_id
            )));
        }
        let normalized = normalize_paper_id(paper_id);
        self.find_paper(&normalized)
            .await?
            .ok_or(PaperScoutError::PaperNotFound(normalized))
    }

    /// Retrieval shared by batch and streaming entry points: validate,
    /// classify, and run the stage state machine up to the final
    /// ranked result list.
    async fn prepare(&self, request: SearchRequest) -> Result<PreparedSearch> {
        request.validate()?;

        let query = request.query.clone().unwrap_or_default();
        let (query_type, paper_id) = classify(&query);

        let mut prepared = PreparedSearch::new(query_type, query.clone(), request.mode);

        if let Some(id) = paper_id {
            self.run_paper_id_search(&mut prepared, &request, id).await?;
        } else {
            self.run_text_search(&mut prepared, &request).await?;
        }
        Ok(prepared)
    }

    /// Free-text path: parse filters, resolve mode, reformulate,
    /// search, aggregate.
    async fn run_text_search(
        &self,
        prepared: &mut PreparedSearch,
        request: &SearchRequest,
    ) -> Result<()> {
        let query = prepared.original_query.clone();

        // Stage: filter parsing (skipped in semantic mode or when the
        // caller disabled it).
        let mut semantic_query = if query.trim().is_empty() {
            None
        } else {
            Some(query.clone())
        };
        if request.parse_filters_from_query
            && request.mode != SearchMode::Semantic
            && !query.trim().is_empty()
        {
            let parsed = self.filter_parser.parse(&query).await;
            prepared.timings.filters_parsed = Some(epoch_millis());

            if !parsed.is_relevant {
                prepared.canned_response = Some(parsed.irrelevant_response.unwrap_or_else(
                    || {
                        "I can only help with searching the academic paper corpus."
                            .to_string()
                    },
                ));
                return Ok(());
            }
            prepared.parsed_filters = parsed.filters.clone();
            semantic_query = parsed.semantic_query;
        } else {
            prepared.timings.filters_parsed = Some(epoch_millis());
        }

        let applied =
            merge_filters(request.filters.as_ref(), prepared.parsed_filters.as_ref());
        let predicate = applied
            .as_ref()
            .and_then(|filters| self.filter_compiler.compile(filters));
        prepared.applied_filters = applied;
        prepared.semantic_query = semantic_query.clone();

        // Stage: mode resolution. Hybrid degrades when one of its two
        // inputs is missing.
        let has_semantic = semantic_query
            .as_deref()
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false);
        let mode = match request.mode {
            SearchMode::Hybrid if !has_semantic => SearchMode::FilterOnly,
            SearchMode::Hybrid if predicate.is_none() => SearchMode::Semantic,
            other => other,
        };
        prepared.mode = mode;

        match mode {
            SearchMode::FilterOnly => {
                let Some(predicate) = predicate else {
                    prepared.canned_response = Some(
                        "I need a bit more to go on. Tell me what to filter by \
                         (for example a year, an author, or title keywords)."
                            .to_string(),
                    );
                    return Ok(());
                };
                let candidates = self
                    .searcher
                    .search_filter_only(&predicate, request.top_k)
                    .await?;
                prepared.timings.search_completed = Some(epoch_millis());
                prepared.results = self.aggregator.deduplicate_simple(candidates, request.top_k);
            }
            SearchMode::Semantic | SearchMode::Hybrid => {
                let text = semantic_query.unwrap_or_else(|| query.clone());
                let queries = self.reformulator.reformulate(&text).await;
                prepared.timings.queries_reformulated = Some(epoch_millis());
                prepared.reformulated_queries = queries.clone();

                let predicate = match mode {
                    SearchMode::Hybrid => predicate,
                    _ => None,
                };
                prepared.results = self
                    .execute_searches(&queries, request.top_k, predicate.as_ref(), None)
                    .await;
                prepared.timings.search_completed = Some(epoch_millis());
            }
        }
        Ok(())
    }

    /// Paper-ID path: fetch the source paper, reformulate from its
    /// title and abstract, and exclude it from its own results.
    async fn run_paper_id_search(
        &self,
        prepared: &mut PreparedSearch,
        request: &SearchRequest,
        paper_id: String,
    ) -> Result<()> {
        prepared.paper_id = Some(paper_id.clone());
        prepared.timings.filters_parsed = Some(epoch_millis());

        // A paper with no abstract can't seed similarity search, so it
        // reads the same as a missing paper to the caller.
        let paper = match self.find_paper(&paper_id).await? {
            Some(paper) if paper.abstract_text.is_some() => paper,
            _ => {
                prepared.canned_response = Some(format!(
                    "I couldn't find paper **{}** in the index.",
                    paper_id
                ));
                return Ok(());
            }
        };
        let abstract_text = paper.abstract_text.clone().unwrap_or_default();

        let queries = self
            .reformulator
            .reformulate_from_paper(&paper.title, &abstract_text)
            .await;
        prepared.timings.queries_reformulated = Some(epoch_millis());
        prepared.reformulated_queries = queries.clone();
        prepared.source_paper = Some(paper);

        prepared.results = self
            .execute_searches(&queries, request.top_k, None, Some(&paper_id))
            .await;
        prepared.timings.search_completed = Some(epoch_millis());
        Ok(())
    }

    /// Run per-query searches sequentially and fuse the lists. Each
    /// search over-fetches so the fused top-k stays saturated after
    /// dedup and self-exclusion.
    async fn execute_searches(
        &self,
        queries: &[String],
        top_k: usize,
        predicate: Option<&Predicate>,
        exclude_paper_id: Option<&str>,
    ) -> Vec<SearchResult> {
        let per_query_k = top_k * self.search_k_multiplier;
        let mut lists = self.searcher.search_many(queries, per_query_k, predicate).await;

        if let Some(excluded) = exclude_paper_id {
            for list in &mut lists {
                list.retain(|candidate| candidate.paper.paper_id != excluded);
            }
        }

        match lists.len() {
            0 => Vec::new(),
            1 => self
                .aggregator
                .deduplicate_simple(lists.pop().unwrap_or_default(), top_k),
            _ => self.aggregator.aggregate(lists, top_k),
        }
    }

    /// Linear scan over the corpus for a paper ID. O(n) fallback in
    /// the absence of a point-lookup index.
    async fn find_paper(&self, paper_id: &str) -> Result<Option<PaperMetadata>> {
        let mut offset = None;
        loop {
            let page = self.store.scroll_page(offset, SCROLL_PAGE_SIZE).await?;
            if let Some(paper) = page
                .papers
                .into_iter()
                .find(|p| p.paper_id == paper_id)
            {
                return Ok(Some(paper));
            }
            match page.next_offset {
                Some(next) => offset = Some(next),
                None => return Ok(None),
            }
        }
    }
}
