use thiserror::Error;

pub type Result<T> = std::result::Result<T, WikiRagError>;

#[derive(Error, Debug)]
pub enum WikiRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Reranker error: {0}")]
    Rerank(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod context;
pub mod document;
pub mod embeddings;
pub mod llm;
pub mod prompts;
pub mod rerank;
pub mod retrieval;
pub mod store;
