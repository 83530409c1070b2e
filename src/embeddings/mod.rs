// Embedding generation module
// Wraps the Ollama embedding API used for both chunks and queries

pub mod ollama;

pub use ollama::EmbeddingClient;

use anyhow::Result;

/// Produces vectors for chunk texts and query texts.
///
/// Asymmetric embedding models treat the two differently, so the trait keeps
/// separate entry points rather than a single `embed`.
pub trait TextEmbedder: Send + Sync {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

impl TextEmbedder for EmbeddingClient {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        EmbeddingClient::embed_documents(self, texts)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        EmbeddingClient::embed_query(self, text)
    }
}
