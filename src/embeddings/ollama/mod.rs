#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::llm::request_with_retry;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Prefix applied to stored chunk text before embedding (nomic-style
/// asymmetric embedding models)
const DOCUMENT_PREFIX: &str = "search_document: ";
/// Prefix applied to query text before embedding
const QUERY_PREFIX: &str = "search_query: ";

/// Client for the Ollama embedding API
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.ollama.embedding_model.clone(),
            batch_size: config.ollama.batch_size,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Check that the server is reachable and the configured model is pulled
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models().context("Server is not reachable")?;

        if models.iter().any(|m| m.name == self.model) {
            info!(
                "Health check passed for Ollama at {} with model {}",
                self.base_url, self.model
            );
            Ok(())
        } else {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Model {} not found. Available models: {:?}",
                self.model, available
            );
            Err(anyhow::anyhow!(
                "Model '{}' is not available. Available models: {:?}",
                self.model,
                available
            ))
        }
    }

    /// List models available on the server
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        Ok(models_response.models)
    }

    /// Embed chunk texts for storage, batched by the configured batch size
    #[inline]
    pub fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} document texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size as usize) {
            let inputs: Vec<String> = batch
                .iter()
                .map(|t| format!("{DOCUMENT_PREFIX}{t}"))
                .collect();
            let batch_embeddings = self
                .embed_batch(inputs)
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;
            embeddings.extend(batch_embeddings);
        }

        Ok(embeddings)
    }

    /// Embed a query text
    #[inline]
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self
            .embed_batch(vec![format!("{QUERY_PREFIX}{text}")])
            .context("Failed to embed query")?;

        embeddings
            .pop()
            .context("Embedding response was empty for query")
    }

    fn embed_batch(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();

        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to generate embeddings")?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        if response.embeddings.len() != expected {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                expected,
                response.embeddings.len()
            ));
        }

        Ok(response.embeddings)
    }
}
