//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Vector index configuration
    #[serde(default)]
    pub vector_index: VectorIndexConfig,

    /// Retrieval pipeline tuning
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the LLM service for chat/completions
    pub url: String,

    /// Model name for chat completions (filter parsing, reformulation, synthesis)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding dimensions
    #[serde(default = "default_embedding_dims")]
    pub embedding_dimensions: usize,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sampling temperature for chat completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per chat completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("PAPERSCOUT_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("PAPERSCOUT_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("PAPERSCOUT_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_embedding_dims),
            api_key: std::env::var("PAPERSCOUT_LLM_API_KEY").ok(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Vector index (Qdrant) connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Base URL of the Qdrant REST API
    pub url: String,

    /// Collection holding the paper corpus
    #[serde(default = "default_collection")]
    pub collection: String,

    /// API key (optional, for hosted clusters)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("PAPERSCOUT_QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            collection: std::env::var("PAPERSCOUT_QDRANT_COLLECTION")
                .unwrap_or_else(|_| default_collection()),
            api_key: std::env::var("PAPERSCOUT_QDRANT_API_KEY").ok(),
            timeout_secs: default_index_timeout(),
        }
    }
}

/// Retrieval pipeline tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of LLM-generated query variants per reformulation
    #[serde(default = "default_num_reformulations")]
    pub num_reformulations: usize,

    /// Per-query result multiplier (each search fetches top_k * multiplier)
    #[serde(default = "default_k_multiplier")]
    pub search_k_multiplier: usize,

    /// RRF constant (higher = more weight to lower ranks)
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    /// Blend weight for raw similarity vs normalized RRF in fusion
    #[serde(default = "default_score_weight")]
    pub score_weight: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            num_reformulations: std::env::var("PAPERSCOUT_NUM_REFORMULATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_num_reformulations),
            search_k_multiplier: std::env::var("PAPERSCOUT_SEARCH_K_MULTIPLIER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_k_multiplier),
            rrf_k: std::env::var("PAPERSCOUT_RRF_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_rrf_k),
            score_weight: std::env::var("PAPERSCOUT_RRF_SCORE_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_score_weight),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("PAPERSCOUT_LLM_MODEL").unwrap_or_else(|_| "llama-3.1-8b-instant".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("PAPERSCOUT_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "nomic-ai/nomic-embed-text-v1.5".to_string())
}

fn default_embedding_dims() -> usize {
    768
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout() -> u64 {
    30
}

fn default_collection() -> String {
    "acl-anthology".to_string()
}

fn default_index_timeout() -> u64 {
    60
}

fn default_num_reformulations() -> usize {
    3
}

fn default_k_multiplier() -> usize {
    2
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_score_weight() -> f64 {
    0.3
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a specific path, falling back to defaults
    /// when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.num_reformulations, 3);
        assert_eq!(config.search_k_multiplier, 2);
        assert_eq!(config.rrf_k, 60.0);
        assert_eq!(config.score_weight, 0.3);
    }

    #[test]
    fn test_config_roundtrip_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.vector_index.collection, config.vector_index.collection);
        assert_eq!(parsed.retrieval.rrf_k, config.retrieval.rrf_k);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yml");

        let mut config = Config::default();
        config.vector_index.collection = "test-collection".to_string();
        config.retrieval.num_reformulations = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.vector_index.collection, "test-collection");
        assert_eq!(loaded.retrieval.num_reformulations, 7);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(loaded.retrieval.search_k_multiplier, 2);
    }
}
