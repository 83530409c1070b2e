// Document store module
// Persists chunk text plus embeddings and answers similarity queries

pub mod vector_store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use vector_store::VectorStore;

/// A chunk ready for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Chunk text, already prefixed and contextualized
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Metadata persisted alongside each chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document the chunk came from
    pub source: String,
}

/// A row returned from a similarity query
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Raw distance reported by the store; lower is more similar
    pub distance: f32,
}

/// Storage backend for embedded chunks.
///
/// Implementations embed the text themselves, so callers hand over plain
/// text for both ingestion and queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a batch of chunks
    async fn add(&mut self, documents: Vec<StoredDocument>) -> Result<()>;

    /// Return up to `k` chunks most similar to the query text, most similar
    /// first
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalResult>>;
}
