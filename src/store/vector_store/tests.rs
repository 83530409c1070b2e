use super::*;
use crate::config::settings::OllamaConfig;
use anyhow::Result;
use tempfile::TempDir;

const TEST_DIMENSION: usize = 8;

/// Deterministic embedder so tests exercise real LanceDB storage without a
/// model server. Identical texts get identical vectors.
struct ByteEmbedder {
    dimension: usize,
}

impl ByteEmbedder {
    fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let bytes = text.as_bytes();
        (0..self.dimension)
            .map(|i| {
                let byte = if bytes.is_empty() {
                    0
                } else {
                    bytes[i % bytes.len()]
                };
                f32::from(byte) / 255.0 + (text.len() % 7) as f32 * 0.01
            })
            .collect()
    }
}

impl TextEmbedder for ByteEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }
}

fn create_test_config(temp_dir: &TempDir, dimension: u32) -> Config {
    Config {
        base_dir: temp_dir.path().to_path_buf(),
        ollama: OllamaConfig {
            embedding_dimension: dimension,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

async fn open_test_store(temp_dir: &TempDir) -> VectorStore {
    let config = create_test_config(temp_dir, TEST_DIMENSION as u32);
    VectorStore::open_with_embedder(&config, Box::new(ByteEmbedder::new(TEST_DIMENSION)))
        .await
        .expect("should open vector store")
}

fn chunk(text: &str, source: &str) -> StoredDocument {
    StoredDocument {
        text: text.to_string(),
        metadata: ChunkMetadata {
            source: source.to_string(),
        },
    }
}

#[tokio::test]
async fn open_creates_empty_collection() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = open_test_store(&temp_dir).await;

    assert_eq!(store.count().await.expect("count succeeds"), 0);
    assert_eq!(store.next_id, 0);
}

#[tokio::test]
async fn add_advances_ids_and_count() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = open_test_store(&temp_dir).await;

    store
        .add(vec![
            chunk("Cow. Cows spawn in grassy biomes.", "cow"),
            chunk("Cow. Cows drop leather.", "cow"),
            chunk("Creeper. Creepers explode.", "creeper"),
        ])
        .await
        .expect("add succeeds");

    assert_eq!(store.count().await.expect("count succeeds"), 3);
    assert_eq!(store.next_id, 3);
}

#[tokio::test]
async fn ids_continue_from_row_count_across_reopens() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    {
        let mut store = open_test_store(&temp_dir).await;
        store
            .add(vec![chunk("First chunk.", "a"), chunk("Second chunk.", "a")])
            .await
            .expect("add succeeds");
    }

    let mut reopened = open_test_store(&temp_dir).await;
    assert_eq!(reopened.next_id, 2);

    reopened
        .add(vec![chunk("Third chunk.", "b")])
        .await
        .expect("add succeeds");
    assert_eq!(reopened.count().await.expect("count succeeds"), 3);
    assert_eq!(reopened.next_id, 3);
}

#[tokio::test]
async fn query_returns_most_similar_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = open_test_store(&temp_dir).await;

    store
        .add(vec![
            chunk("Cow. Cows drop leather.", "cow"),
            chunk("Creeper. Creepers explode when close.", "creeper"),
            chunk("Panda. Pandas eat bamboo.", "panda"),
        ])
        .await
        .expect("add succeeds");

    let results = store
        .query("Cow. Cows drop leather.", 2)
        .await
        .expect("query succeeds");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, "Cow. Cows drop leather.");
    assert_eq!(results[0].metadata.source, "cow");
    assert!(results[0].distance <= results[1].distance);
}

#[tokio::test]
async fn empty_add_is_a_no_op() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = open_test_store(&temp_dir).await;

    store.add(vec![]).await.expect("empty add succeeds");

    assert_eq!(store.count().await.expect("count succeeds"), 0);
    assert_eq!(store.next_id, 0);
}

#[tokio::test]
async fn mismatched_vector_dimension_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = create_test_config(&temp_dir, TEST_DIMENSION as u32);
    let mut store = VectorStore::open_with_embedder(&config, Box::new(ByteEmbedder::new(4)))
        .await
        .expect("should open vector store");

    let result = store.add(vec![chunk("Some chunk text here.", "a")]).await;

    assert!(matches!(result, Err(WikiRagError::Store(_))));
    assert_eq!(store.count().await.expect("count succeeds"), 0);
}

#[tokio::test]
async fn changed_embedding_dimension_fails_open() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    {
        let mut store = open_test_store(&temp_dir).await;
        store
            .add(vec![chunk("First chunk.", "a")])
            .await
            .expect("add succeeds");
    }

    let config = create_test_config(&temp_dir, 16);
    let result = VectorStore::open_with_embedder(&config, Box::new(ByteEmbedder::new(16))).await;

    assert!(matches!(result, Err(WikiRagError::Store(_))));
}
