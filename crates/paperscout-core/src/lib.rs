//! PaperScout Core Library
//!
//! Core functionality for the paperscout retrieval-augmented paper
//! search pipeline.
//!
//! # Features
//! - Paper-ID classification for current and legacy ACL Anthology IDs
//! - LLM-powered filter extraction and query reformulation
//! - Qdrant vector search with structured payload filters
//! - Hybrid Reciprocal Rank Fusion (RRF) + raw-score result fusion
//! - Streaming response synthesis with citation context

pub mod config;
pub mod error;
pub mod filters;
pub mod llm;
pub mod pipeline;
pub mod query;
pub mod search;
pub mod store;

pub use config::{Config, LLMServiceConfig, RetrievalConfig, VectorIndexConfig};
pub use error::{PaperScoutError, Result};
pub use filters::{merge_filters, SearchFilters, YearFilter};
pub use llm::{
    ChatMessage, Embedder, FilterParser, HttpEmbedder, LlmClient, MetricsSnapshot, OpenAiClient,
    ParsedQuery, Reformulator, ResponseSynthesizer,
};
pub use pipeline::{
    SearchMode, SearchPipeline, SearchRequest, SearchResponse, StreamEvent, StreamMetadata,
};
pub use query::{classify, is_valid_paper_id, normalize_paper_id, QueryKind};
pub use search::{
    PaperMetadata, QuerySearcher, ResultAggregator, ScoredCandidate, SearchResult,
};
pub use store::{QdrantStore, ScrollPage, VectorStore};

/// Directory name used for configuration files
pub const CONFIG_DIR_NAME: &str = "paperscout";
