//! Text embedding providers.
//!
//! Every vector that enters the index or is used as a query comes out of an
//! [`Embedder`]. Ingestion and query embedding go through the same
//! [`Embedder::embed`] call so the two sides stay in one metric space.

#[cfg(feature = "fastembed")]
pub mod onnx;
pub mod hash;
pub mod ollama;


use std::sync::Arc;

use tracing::info;

use crate::config::{Config, EmbeddingProvider};
use crate::{RagError, Result};

pub use hash::HashEmbedder;
pub use ollama::OllamaClient;

/// A dense vector produced by an [`Embedder`]
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    pub(crate) fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

/// Maps text to vectors with one fixed model.
pub trait Embedder: Send + Sync {
    /// Embed a batch; one vector per input, in input order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Identifier recorded next to a built index, `"<provider>:<model>"`.
    fn model_id(&self) -> String;

    /// Single-item convenience over [`Embedder::embed`].
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Embedding> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Embedder returned no vector".to_string()))
    }
}

/// Check a provider response: one vector per input and a single dimension.
pub(crate) fn check_batch(inputs: usize, vectors: Vec<Vec<f32>>) -> Result<Vec<Embedding>> {
    if vectors.len() != inputs {
        return Err(RagError::Embedding(format!(
            "Mismatch between request and response counts: {} vs {}",
            inputs,
            vectors.len()
        )));
    }

    let Some(dimension) = vectors.first().map(Vec::len) else {
        return Ok(Vec::new());
    };

    if dimension == 0 {
        return Err(RagError::Embedding(
            "Embedder returned an empty vector".to_string(),
        ));
    }

    if let Some(position) = vectors.iter().position(|v| v.len() != dimension) {
        return Err(RagError::Embedding(format!(
            "Vector {} has dimension {} but the batch started with {}",
            position,
            vectors[position].len(),
            dimension
        )));
    }

    Ok(vectors.into_iter().map(Embedding::new).collect())
}

/// Build the embedder selected in the configuration.
#[inline]
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedding = &config.embedding;
    info!(
        "Using {} embedder with model {}",
        embedding.provider, embedding.model
    );

    match embedding.provider {
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaClient::new(config)?)),
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(
            embedding.embedding_dimension as usize,
        ))),
        #[cfg(feature = "fastembed")]
        EmbeddingProvider::FastEmbed => Ok(Arc::new(onnx::FastEmbedder::new(config)?)),
        #[cfg(not(feature = "fastembed"))]
        EmbeddingProvider::FastEmbed => Err(RagError::Config(
            "The fastembed provider requires building with `--features fastembed`".to_string(),
        )),
    }
}
