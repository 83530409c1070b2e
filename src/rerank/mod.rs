#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::llm::request_with_retry;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Scores candidate texts against a query with a cross-encoder.
///
/// Higher scores mean more relevant. The returned vector is parallel to the
/// input texts.
pub trait Reranker: Send + Sync {
    fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
}

/// Client for a text-embeddings-inference compatible `/rerank` endpoint
#[derive(Debug, Clone)]
pub struct CrossEncoderClient {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankRank {
    index: usize,
    score: f32,
}

impl CrossEncoderClient {
    /// Connect to the reranking service, failing if it is unreachable.
    ///
    /// Reranking silently degrading to vector-order results would be hard to
    /// notice, so an unreachable service is an error rather than a fallback.
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .reranker_url()
            .context("Failed to parse reranker URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        let client = Self {
            base_url,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        };

        client
            .health_check()
            .context("Reranker service is not available")?;

        Ok(client)
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    fn health_check(&self) -> Result<()> {
        let url = self
            .base_url
            .join("health")
            .context("Failed to build health URL")?;

        debug!("Checking reranker health at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .with_context(|| format!("Health check failed for reranker at {}", self.base_url))?;

        info!("Reranker health check passed at {}", self.base_url);
        Ok(())
    }
}

impl Reranker for CrossEncoderClient {
    #[inline]
    fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self
            .base_url
            .join("rerank")
            .context("Failed to build rerank URL")?;

        let request = RerankRequest { query, texts };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize rerank request")?;

        debug!("Reranking {} texts against query", texts.len());

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Rerank request failed")?;

        let ranks: Vec<RerankRank> =
            serde_json::from_str(&response_text).context("Failed to parse rerank response")?;

        // The service returns ranks sorted by score; map them back to input
        // positions so the result is parallel to `texts`
        let mut scores: Vec<Option<f32>> = vec![None; texts.len()];
        for rank in ranks {
            let slot = scores.get_mut(rank.index).with_context(|| {
                format!(
                    "Rerank response index {} out of range for {} texts",
                    rank.index,
                    texts.len()
                )
            })?;
            *slot = Some(rank.score);
        }

        scores
            .into_iter()
            .enumerate()
            .map(|(index, score)| {
                score.with_context(|| format!("Rerank response missing score for text {index}"))
            })
            .collect()
    }
}

/// Reorder items by descending score.
///
/// The sort is stable, so ties keep their original relative order, and the
/// output is a permutation of the input.
#[inline]
pub fn order_by_score<T>(items: Vec<T>, scores: &[f32]) -> Result<Vec<T>> {
    if items.len() != scores.len() {
        anyhow::bail!(
            "Got {} scores for {} items",
            scores.len(),
            items.len()
        );
    }

    let mut scored: Vec<(f32, T)> = scores.iter().copied().zip(items).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    Ok(scored.into_iter().map(|(_, item)| item).collect())
}
