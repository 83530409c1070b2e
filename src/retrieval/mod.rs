
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::rerank::{Reranker, order_by_score};
use crate::store::{ChunkMetadata, DocumentStore, RetrievalResult, StoredDocument};
use crate::{Result, WikiRagError};

/// Outcome of ingesting a directory of chunk files
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub chunks_added: usize,
}

/// Retrieval front end over a document store, with optional cross-encoder
/// reranking.
///
/// When a reranker is present, more candidates than requested are fetched
/// from the store, reordered by cross-encoder score, and truncated to the
/// requested count. Vector similarity alone is a coarse signal; the
/// cross-encoder reads the query and candidate together and ranks far more
/// accurately over a small candidate pool.
pub struct Retriever<S: DocumentStore> {
    store: S,
    reranker: Option<Box<dyn Reranker>>,
    rerank_candidates: usize,
}

impl<S: DocumentStore> Retriever<S> {
    #[inline]
    pub fn new(store: S, reranker: Option<Box<dyn Reranker>>, rerank_candidates: usize) -> Self {
        Self {
            store,
            reranker,
            rerank_candidates,
        }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the `k` chunks most relevant to the query, best first
    #[inline]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let fetch = if self.reranker.is_some() {
            self.rerank_candidates.max(k)
        } else {
            k
        };

        debug!("Fetching {} candidates for query", fetch);
        let mut results = self.store.query(query, fetch).await?;

        if let Some(reranker) = &self.reranker {
            let texts: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
            let scores = reranker
                .score(query, &texts)
                .map_err(|e| WikiRagError::Rerank(format!("{e:#}")))?;
            results =
                order_by_score(results, &scores).map_err(|e| WikiRagError::Rerank(format!("{e:#}")))?;
        }

        results.truncate(k);
        Ok(results)
    }

    /// Load every chunk file in a directory into the store.
    ///
    /// Files are processed in name order so ingestion is deterministic. A
    /// file that fails to parse is skipped with a warning; a store failure
    /// aborts the run.
    #[inline]
    pub async fn ingest_chunk_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<IngestStats> {
        let dir = dir.as_ref();

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_chunk_file = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_chunk_file {
                paths.push(path);
            }
        }
        paths.sort();

        info!("Ingesting {} chunk files from {}", paths.len(), dir.display());

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(paths.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Ingesting {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut stats = IngestStats::default();

        for path in paths {
            bar.set_message(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );

            let documents = match load_chunk_file(&path) {
                Ok(documents) => documents,
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    stats.files_skipped += 1;
                    bar.inc(1);
                    continue;
                }
            };

            let count = documents.len();
            self.store.add(documents).await?;

            stats.files_loaded += 1;
            stats.chunks_added += count;
            bar.inc(1);
        }

        bar.finish_and_clear();
        info!(
            "Ingested {} chunks from {} files ({} skipped)",
            stats.chunks_added, stats.files_loaded, stats.files_skipped
        );

        Ok(stats)
    }
}

/// A chunk file is a JSON array of chunk texts; the source name comes from
/// the file stem.
fn load_chunk_file(path: &Path) -> anyhow::Result<Vec<StoredDocument>> {
    use anyhow::Context;

    let source = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("Chunk file has no file name")?;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read chunk file: {}", path.display()))?;
    let texts: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse chunk file: {}", path.display()))?;

    Ok(texts
        .into_iter()
        .map(|text| StoredDocument {
            text,
            metadata: ChunkMetadata {
                source: source.clone(),
            },
        })
        .collect())
}
