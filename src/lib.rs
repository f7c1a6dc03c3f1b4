use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Extraction error in {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("No documents found in any source, nothing to index")]
    EmptyCorpus,

    #[error("Index not found at {index_path} / {text_path}. Run `firstaid-rag ingest` first")]
    NotIngested {
        index_path: PathBuf,
        text_path: PathBuf,
    },

    #[error("Service is not ready: {0}")]
    NotReady(String),

    #[error("Index artifacts are inconsistent: {0}")]
    Inconsistent(String),

    #[error("Index was built with model '{built_with}' but the active model is '{active}'")]
    ModelMismatch { built_with: String, active: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod retrieval;
pub mod server;
