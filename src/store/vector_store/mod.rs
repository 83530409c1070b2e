#[cfg(test)]
mod tests;

use super::{ChunkMetadata, DocumentStore, RetrievalResult, StoredDocument};
use crate::WikiRagError;
use crate::config::Config;
use crate::embeddings::{EmbeddingClient, TextEmbedder};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "chunks";

/// LanceDB-backed document store.
///
/// Row ids count up from the number of rows present when the store was
/// opened, so ids stay unique and monotone across runs as long as rows are
/// never deleted.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    embedder: Box<dyn TextEmbedder>,
    dimension: usize,
    next_id: u64,
}

impl VectorStore {
    /// Open the store at the configured path, creating the collection on
    /// first use
    #[inline]
    pub async fn open(config: &Config) -> Result<Self, WikiRagError> {
        let embedder = EmbeddingClient::new(config)
            .map_err(|e| WikiRagError::Embedding(format!("{e:#}")))?;
        Self::open_with_embedder(config, Box::new(embedder)).await
    }

    /// Open the store with an explicit embedder
    #[inline]
    pub async fn open_with_embedder(
        config: &Config,
        embedder: Box<dyn TextEmbedder>,
    ) -> Result<Self, WikiRagError> {
        let db_path = config.vector_db_path();
        debug!("Opening LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(&db_path).map_err(|e| {
            WikiRagError::Store(format!("Failed to create vector database directory: {e}"))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to connect to LanceDB: {e}")))?;

        let dimension = config.ollama.embedding_dimension as usize;

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            embedder,
            dimension,
            next_id: 0,
        };

        store.initialize_table().await?;
        store.next_id = store.count().await?;

        info!(
            "Vector store opened with {} existing chunks",
            store.next_id
        );
        Ok(store)
    }

    /// Create the chunks table if missing, or verify its vector dimension if
    /// present
    async fn initialize_table(&mut self) -> Result<(), WikiRagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&self.table_name) {
            let existing = self.detect_existing_dimension().await?;
            if existing != self.dimension {
                return Err(WikiRagError::Store(format!(
                    "Existing collection uses {existing}-dimensional vectors but the \
                     configured embedding dimension is {}; re-ingest after changing \
                     embedding models",
                    self.dimension
                )));
            }
            return Ok(());
        }

        info!(
            "Creating chunks table with {}-dimensional vectors",
            self.dimension
        );

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to create table: {e}")))?;

        Ok(())
    }

    async fn detect_existing_dimension(&self) -> Result<usize, WikiRagError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to open existing table: {e}")))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to get table schema: {e}")))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(WikiRagError::Store(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::UInt64, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Total number of chunks stored
    #[inline]
    pub async fn count(&self) -> Result<u64, WikiRagError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to open table: {e}")))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to count rows: {e}")))?;

        Ok(count as u64)
    }

    fn create_record_batch(
        &self,
        documents: &[StoredDocument],
        vectors: &[Vec<f32>],
    ) -> Result<RecordBatch, WikiRagError> {
        let len = documents.len();

        let ids: Vec<u64> = (self.next_id..self.next_id + len as u64).collect();
        let contents: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let sources: Vec<&str> = documents.iter().map(|d| d.metadata.source.as_str()).collect();
        let created_at = chrono::Utc::now().to_rfc3339();
        let created_ats: Vec<&str> = vec![created_at.as_str(); len];

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for vector in vectors {
            flat_values.extend_from_slice(vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, self.dimension as i32, Arc::new(values_array), None)
                .map_err(|e| WikiRagError::Store(format!("Failed to create vector array: {e}")))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(UInt64Array::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| WikiRagError::Store(format!("Failed to create record batch: {e}")))
    }

    fn parse_result_batch(batch: &RecordBatch) -> Result<Vec<RetrievalResult>, WikiRagError> {
        let num_rows = batch.num_rows();
        let mut results = Vec::with_capacity(num_rows);

        let contents = batch
            .column_by_name("content")
            .ok_or_else(|| WikiRagError::Store("Missing content column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| WikiRagError::Store("Invalid content column type".to_string()))?;

        let sources = batch
            .column_by_name("source")
            .ok_or_else(|| WikiRagError::Store("Missing source column".to_string()))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| WikiRagError::Store("Invalid source column type".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        for row in 0..num_rows {
            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            results.push(RetrievalResult {
                text: contents.value(row).to_string(),
                metadata: ChunkMetadata {
                    source: sources.value(row).to_string(),
                },
                distance,
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl DocumentStore for VectorStore {
    #[inline]
    async fn add(&mut self, documents: Vec<StoredDocument>) -> crate::Result<()> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(());
        }

        debug!("Storing batch of {} chunks", documents.len());

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_documents(&texts)
            .map_err(|e| WikiRagError::Embedding(format!("{e:#}")))?;

        if vectors.len() != documents.len() {
            return Err(WikiRagError::Embedding(format!(
                "Embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }
        if let Some(vector) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(WikiRagError::Store(format!(
                "Embedder produced a {}-dimensional vector but the collection \
                 stores {}-dimensional vectors",
                vector.len(),
                self.dimension
            )));
        }

        let record_batch = self.create_record_batch(&documents, &vectors)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to open table: {e}")))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to insert chunks: {e}")))?;

        self.next_id += documents.len() as u64;

        info!("Stored {} chunks", documents.len());
        Ok(())
    }

    #[inline]
    async fn query(&self, text: &str, k: usize) -> crate::Result<Vec<RetrievalResult>> {
        debug!("Similarity query with limit {}", k);

        let query_vector = self
            .embedder
            .embed_query(text)
            .map_err(|e| WikiRagError::Embedding(format!("{e:#}")))?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to open table: {e}")))?;

        let mut stream = table
            .vector_search(query_vector.as_slice())
            .map_err(|e| WikiRagError::Store(format!("Failed to create vector search: {e}")))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to execute search: {e}")))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| WikiRagError::Store(format!("Failed to read result stream: {e}")))?
        {
            results.extend(Self::parse_result_batch(&batch)?);
        }

        debug!("Query returned {} results", results.len());
        Ok(results)
    }
}
