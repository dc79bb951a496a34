//! LLM integration
//!
//! Provides traits and implementations for:
//! - Chat completion and embedding generation via OpenAI-compatible services
//! - Filter extraction from natural language queries
//! - Query reformulation
//! - Response synthesis with citation context

mod cache;
mod client;
mod filter_parser;
mod reformulator;
mod synthesizer;
mod traits;

pub use client::{ChatMessage, LlmClient, MetricsSnapshot, OpenAiClient};
pub use filter_parser::{FilterParser, ParsedQuery};
pub use reformulator::Reformulator;
pub use synthesizer::ResponseSynthesizer;
pub use traits::{Embedder, HttpEmbedder};
