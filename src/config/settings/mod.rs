
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Model used to embed chunks and queries
    pub embedding_model: String,
    /// Model used for contextualization and answer generation
    pub chat_model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text:latest".to_string(),
            chat_model: "qwen2.5:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Cross-encoder reranking service settings. The service is expected to
/// expose a text-embeddings-inference compatible `/rerank` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub url: String,
}

impl Default for RerankerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8087".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// How many candidates to over-fetch from the vector store before
    /// reranking, regardless of the requested result count
    pub rerank_candidates: usize,
    /// Result count used when the caller does not specify one
    pub default_k: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            rerank_candidates: 15,
            default_k: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid split trigger: {0} tokens (must be between 10 and 4096)")]
    InvalidSplitTrigger(usize),
    #[error("Invalid max chunk size: {0} chars (must be between 100 and 8192)")]
    InvalidMaxChunkChars(usize),
    #[error("Overlap ({0}) must be smaller than max chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Minimum chunk floor ({0}) must be smaller than max chunk size ({1})")]
    MinChunkTooLarge(usize, usize),
    #[error("Invalid rerank candidate count: {0} (must be between 1 and 100)")]
    InvalidRerankCandidates(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            reranker: RerankerConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            base_dir: Self::config_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl Config {
    /// Load configuration from the default config directory
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to locate config directory")?;
        Self::load_from(config_dir)
    }

    /// Load configuration rooted at an explicit base directory
    #[inline]
    pub fn load_from<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: base_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = base_dir.as_ref().to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("wiki-rag"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Where the LanceDB collection lives
    #[inline]
    pub fn vector_db_path(&self) -> PathBuf {
        self.base_dir.join("vectors")
    }

    /// Default location for persisted chunk files (one JSON array per document)
    #[inline]
    pub fn chunks_dir(&self) -> PathBuf {
        self.base_dir.join("chunks")
    }

    /// Directory holding prompt template overrides
    #[inline]
    pub fn prompts_dir(&self) -> PathBuf {
        self.base_dir.join("prompts")
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_string = format!(
            "{}://{}:{}",
            self.ollama.protocol, self.ollama.host, self.ollama.port
        );
        Url::parse(&url_string).map_err(|_| ConfigError::InvalidUrl(url_string))
    }

    #[inline]
    pub fn reranker_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.reranker.url)
            .map_err(|_| ConfigError::InvalidUrl(self.reranker.url.clone()))
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;

        if self.reranker.enabled {
            self.reranker_url()?;
        }

        let chunking = &self.chunking;
        if !(10..=4096).contains(&chunking.min_tokens_for_split) {
            return Err(ConfigError::InvalidSplitTrigger(
                chunking.min_tokens_for_split,
            ));
        }
        if !(100..=8192).contains(&chunking.max_chunk_chars) {
            return Err(ConfigError::InvalidMaxChunkChars(chunking.max_chunk_chars));
        }
        if chunking.overlap_chars >= chunking.max_chunk_chars {
            return Err(ConfigError::OverlapTooLarge(
                chunking.overlap_chars,
                chunking.max_chunk_chars,
            ));
        }
        if chunking.min_chunk_chars >= chunking.max_chunk_chars {
            return Err(ConfigError::MinChunkTooLarge(
                chunking.min_chunk_chars,
                chunking.max_chunk_chars,
            ));
        }

        if !(1..=100).contains(&self.retrieval.rerank_candidates) {
            return Err(ConfigError::InvalidRerankCandidates(
                self.retrieval.rerank_candidates,
            ));
        }

        Ok(())
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if !(1..=1000).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }
        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }
        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }
        Ok(())
    }
}
