//! In-process embeddings through fastembed (ONNX runtime).

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use super::{Embedder, Embedding, check_batch};
use crate::config::Config;
use crate::{RagError, Result};

/// Local sentence-embedding model, loaded once and shared
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
    model_name: String,
    batch_size: usize,
}

impl FastEmbedder {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let model_name = config.embedding.model.clone();
        let model = model_from_name(&model_name)?;

        info!("Loading fastembed model {}", model_name);
        let options = InitOptions::new(model)
            .with_cache_dir(config.model_cache_dir())
            .with_show_download_progress(console::user_attended_stderr());

        let text_embedding = TextEmbedding::try_new(options).map_err(|e| {
            RagError::Embedding(format!("Failed to initialize fastembed model: {}", e))
        })?;

        Ok(Self {
            model: Mutex::new(text_embedding),
            model_name,
            batch_size: config.embedding.batch_size as usize,
        })
    }
}

/// Map a Hugging Face model name onto a fastembed model
#[inline]
pub fn model_from_name(name: &str) -> Result<EmbeddingModel> {
    match name {
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "BAAI/bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "sentence-transformers/all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "nomic-ai/nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        other => Err(RagError::Config(format!(
            "Unsupported fastembed model '{}'",
            other
        ))),
    }
}

impl Embedder for FastEmbedder {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding {} texts with {}", texts.len(), self.model_name);
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let mut model = self
            .model
            .lock()
            .map_err(|_| RagError::Embedding("fastembed model lock poisoned".to_string()))?;
        let vectors = model
            .embed(inputs, Some(self.batch_size))
            .map_err(|e| RagError::Embedding(format!("fastembed embedding failed: {}", e)))?;

        check_batch(texts.len(), vectors)
    }

    #[inline]
    fn model_id(&self) -> String {
        format!("fastembed:{}", self.model_name)
    }
}
