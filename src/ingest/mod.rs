//! Offline ingestion: load the corpus, embed every unit, build and persist the
//! index together with its text table.


use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::config::{Config, CorpusConfig};
use crate::embeddings::{Embedder, Embedding};
use crate::index::{ArtifactStore, FlatIndex};
use crate::loader::{SourceStats, load_corpus};
use crate::{RagError, Result};

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub sources: Vec<SourceStats>,
    pub total_units: usize,
    pub dimension: usize,
    pub model_id: String,
    pub index_path: PathBuf,
    pub text_path: PathBuf,
    pub elapsed: Duration,
}

pub struct Ingestor {
    corpus: CorpusConfig,
    batch_size: usize,
    expected_dimension: usize,
    embedder: Arc<dyn Embedder>,
    store: ArtifactStore,
}

impl Ingestor {
    #[inline]
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            corpus: config.resolved_corpus(),
            batch_size: config.embedding.batch_size.max(1) as usize,
            expected_dimension: config.embedding.embedding_dimension as usize,
            embedder,
            store: ArtifactStore::from_config(config),
        }
    }

    #[inline]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run the whole pipeline.
    ///
    /// Nothing is written when the corpus is empty or any embedding batch
    /// fails.
    #[inline]
    pub fn run(&self) -> Result<IngestReport> {
        let start = Instant::now();
        info!(
            "Starting ingestion from {}",
            self.corpus.data_dir.display()
        );

        let corpus = load_corpus(&self.corpus);
        if corpus.is_empty() {
            warn!("No documents found in any source");
            return Err(RagError::EmptyCorpus);
        }

        let embeddings = self.embed_all(&corpus.documents)?;
        let index = FlatIndex::build(&embeddings)?;

        if index.dimension() != self.expected_dimension {
            warn!(
                "Embedder produced {}-dimensional vectors but embedding_dimension is {}",
                index.dimension(),
                self.expected_dimension
            );
        }

        let model_id = self.embedder.model_id();
        self.store.save(&index, &corpus.documents, &model_id)?;

        let report = IngestReport {
            total_units: corpus.len(),
            sources: corpus.sources,
            dimension: index.dimension(),
            model_id,
            index_path: self.store.index_path().to_path_buf(),
            text_path: self.store.text_path().to_path_buf(),
            elapsed: start.elapsed(),
        };

        info!(
            "Ingestion complete: {} units indexed with {} in {:.2}s",
            report.total_units,
            report.model_id,
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }

    /// Embed `texts` in batches, preserving order
    fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new(texts.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut embeddings = Vec::with_capacity(texts.len());
        for (batch_number, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(
                "Embedding batch {} with {} units",
                batch_number + 1,
                batch.len()
            );
            let vectors = self.embedder.embed(batch)?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Expected {} vectors for batch {}, got {}",
                    batch.len(),
                    batch_number + 1,
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        Ok(embeddings)
    }
}
