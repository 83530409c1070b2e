use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::chunking::chunk_document;
use crate::config::Config;
use crate::context::Contextualizer;
use crate::document::Document;
use crate::embeddings::EmbeddingClient;
use crate::llm::{OllamaChatClient, TextCompletion};
use crate::prompts::PromptTemplate;
use crate::rerank::{CrossEncoderClient, Reranker};
use crate::retrieval::Retriever;
use crate::store::VectorStore;

/// Chunk every markdown page in a directory into JSON chunk files
#[inline]
pub async fn chunk_directory(
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    contextualize: bool,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let output_dir = output_dir.unwrap_or_else(|| config.chunks_dir());

    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(&input_dir)
        .with_context(|| format!("Failed to read input directory: {}", input_dir.display()))?
    {
        let path = entry?.path();
        let is_markdown = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if is_markdown {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        println!("No markdown files found in {}", input_dir.display());
        return Ok(());
    }

    let contextualizer = if contextualize {
        let client = OllamaChatClient::new(&config).context("Failed to create chat client")?;
        let template = PromptTemplate::contextual_chunk(&config.prompts_dir())
            .context("Failed to load contextual chunk template")?;
        Some(Contextualizer::new(Box::new(client), template))
    } else {
        None
    };

    println!("Chunking {} pages from {}", paths.len(), input_dir.display());

    let mut pages_chunked = 0;
    let mut pages_failed = 0;
    let mut total_chunks = 0;

    for path in &paths {
        match chunk_page(path, &output_dir, &config, contextualizer.as_ref()) {
            Ok(count) => {
                pages_chunked += 1;
                total_chunks += count;
            }
            Err(e) => {
                warn!("Failed to chunk {}: {:#}", path.display(), e);
                pages_failed += 1;
            }
        }
    }

    println!(
        "Chunked {} pages into {} chunks ({} failed)",
        pages_chunked, total_chunks, pages_failed
    );
    println!("Chunk files written to {}", output_dir.display());

    Ok(())
}

fn chunk_page(
    path: &Path,
    output_dir: &Path,
    config: &Config,
    contextualizer: Option<&Contextualizer>,
) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page: {}", path.display()))?;

    let source = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("Page has no file name")?;

    match Document::parse(&content) {
        Ok(document) => info!("Chunking page: {}", document.title),
        Err(e) => warn!("Page {} has no parseable title: {:#}", path.display(), e),
    }

    let mut chunks = chunk_document(&content, &config.chunking);
    if let Some(contextualizer) = contextualizer {
        chunks = contextualizer.contextualize_chunks(&content, &chunks);
    }

    // Each chunk file is a JSON array of chunk texts; ingestion derives the
    // source name from the file stem.
    let count = chunks.len();
    let json =
        serde_json::to_string_pretty(&chunks).context("Failed to serialize chunks to JSON")?;
    let output_path = output_dir.join(format!("{source}.json"));
    std::fs::write(&output_path, json)
        .with_context(|| format!("Failed to write chunk file: {}", output_path.display()))?;

    Ok(count)
}

/// Embed chunk files and load them into the vector store
#[inline]
pub async fn ingest(chunks_dir: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let chunks_dir = chunks_dir.unwrap_or_else(|| config.chunks_dir());

    let embedder = EmbeddingClient::new(&config).context("Failed to create embedding client")?;
    embedder.health_check().context(
        "Ollama is not ready for embedding generation; use 'wiki-rag config' to update settings",
    )?;

    let store = VectorStore::open(&config)
        .await
        .context("Failed to open vector store")?;

    let mut retriever = Retriever::new(store, None, config.retrieval.rerank_candidates);
    let stats = retriever
        .ingest_chunk_dir(&chunks_dir)
        .await
        .context("Ingestion failed")?;

    println!(
        "Ingested {} chunks from {} files ({} skipped)",
        stats.chunks_added, stats.files_loaded, stats.files_skipped
    );
    println!(
        "Vector store now holds {} chunks",
        retriever.store().count().await?
    );

    Ok(())
}

/// Answer a question from the indexed wiki
#[inline]
pub async fn ask(query: String, k: Option<usize>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let k = k.unwrap_or(config.retrieval.default_k);

    let store = VectorStore::open(&config)
        .await
        .context("Failed to open vector store")?;

    let reranker: Option<Box<dyn Reranker>> = if config.reranker.enabled {
        let client = CrossEncoderClient::new(&config).context(
            "Reranking is enabled but the reranker service is unreachable; \
             disable it with 'wiki-rag config' or start the service",
        )?;
        Some(Box::new(client))
    } else {
        None
    };

    let retriever = Retriever::new(store, reranker, config.retrieval.rerank_candidates);
    let results = retriever.retrieve(&query, k).await?;

    if results.is_empty() {
        println!("No relevant chunks found. Run 'wiki-rag ingest' first.");
        return Ok(());
    }

    let context: String = results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let template = PromptTemplate::answer(&config.prompts_dir())
        .context("Failed to load answer template")?;
    let prompt = template.render(&[("context", context.as_str()), ("query", query.as_str())])?;

    let client = OllamaChatClient::new(&config).context("Failed to create chat client")?;
    let answer = tokio::task::spawn_blocking(move || client.complete(&prompt))
        .await
        .context("Answer generation task failed")??;

    println!("{answer}");
    println!();

    let mut sources: Vec<&str> = Vec::new();
    for result in &results {
        if !sources.contains(&result.metadata.source.as_str()) {
            sources.push(result.metadata.source.as_str());
        }
    }
    println!("Sources: {}", sources.join(", "));

    Ok(())
}

/// Show connectivity and index status
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Wiki RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    match EmbeddingClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding Model: {}", config.ollama.embedding_model);
                println!("   💬 Chat Model: {}", config.ollama.chat_model);
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {e:#}");
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {e:#}");
        }
    }

    println!("🔍 Vector Store Status:");
    match VectorStore::open(&config).await {
        Ok(store) => match store.count().await {
            Ok(count) => {
                println!("   ✅ LanceDB: Connected");
                println!("   📄 Chunks Indexed: {count}");
            }
            Err(e) => {
                println!("   ⚠️  LanceDB: Connected but unreadable - {e}");
            }
        },
        Err(e) => {
            println!("   ❌ LanceDB: Failed to open - {e}");
        }
    }

    println!("🎯 Reranker Status:");
    if config.reranker.enabled {
        match CrossEncoderClient::new(&config) {
            Ok(_) => println!("   ✅ Reranker: Connected ({})", config.reranker.url),
            Err(e) => println!("   ❌ Reranker: Unreachable - {e:#}"),
        }
    } else {
        println!("   💤 Reranker: Disabled");
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'wiki-rag chunk <dir>' to chunk wiki pages");
    println!("   • Use 'wiki-rag ingest' to embed and index the chunks");
    println!("   • Use 'wiki-rag ask <question>' to query the index");

    Ok(())
}
