//! Query-time state and nearest-neighbor retrieval.
//!
//! A [`ServingContext`] is built once at startup and never mutated. When the
//! embedding model or the artifacts cannot be loaded it is kept in a not-ready
//! state so the service can still start and report the problem on every
//! request.


use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::answer::{Answer, AnswerPolicy};
use crate::config::Config;
use crate::embeddings::{Embedder, create_embedder};
use crate::index::{ArtifactStore, FlatIndex};
use crate::loader::snippet;
use crate::{RagError, Result};

/// One retrievable unit of corpus text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    /// Row position in the persisted text table
    pub id: usize,
    pub text: String,
    pub source_tag: String,
}

/// One ranked hit
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub id: usize,
    pub text: String,
    /// Squared L2 distance to the query, 0 is an exact match
    pub distance: f32,
    pub source_tag: String,
    /// Display prefix of `text`, never used for ranking
    pub snippet: String,
}

/// Everything a query needs, loaded from the persisted artifacts
pub struct Resources {
    embedder: Arc<dyn Embedder>,
    index: FlatIndex,
    units: Vec<TextUnit>,
}

impl Resources {
    /// Load the artifacts under the configured base directory.
    ///
    /// Fails when they are missing, inconsistent or built with another model.
    #[inline]
    pub fn load(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = ArtifactStore::from_config(config);
        let artifacts = store.load(&embedder.model_id())?;

        let units = artifacts
            .texts
            .into_iter()
            .enumerate()
            .map(|(id, text)| TextUnit {
                id,
                text,
                source_tag: config.corpus.source_tag.clone(),
            })
            .collect();

        Ok(Self::new(embedder, artifacts.index, units))
    }

    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: FlatIndex, units: Vec<TextUnit>) -> Self {
        Self {
            embedder,
            index,
            units,
        }
    }

    #[inline]
    pub fn units(&self) -> &[TextUnit] {
        &self.units
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }
}

enum ServingState {
    Ready(Resources),
    NotReady(String),
}

pub struct ServingContext {
    state: ServingState,
    model_id: String,
    top_k: usize,
    snippet_chars: usize,
    policy: AnswerPolicy,
}

impl ServingContext {
    /// Build the configured embedder and load resources with it. A model that
    /// cannot be constructed leaves the context not ready.
    #[inline]
    pub fn start(config: &Config) -> Self {
        match create_embedder(config) {
            Ok(embedder) => Self::load(config, embedder),
            Err(e) => {
                let model_id = format!(
                    "{}:{}",
                    config.embedding.provider, config.embedding.model
                );
                warn!("Starting without an embedding model: {}", e);
                Self::not_ready(config, model_id, e.to_string())
            }
        }
    }

    /// Load resources, falling back to the not-ready state on any failure.
    #[inline]
    pub fn load(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        let model_id = embedder.model_id();
        match Resources::load(config, embedder) {
            Ok(resources) => {
                info!(
                    "Loaded {} text units for model {}",
                    resources.units.len(),
                    model_id
                );
                Self::ready(config, resources)
            }
            Err(e) => {
                warn!("Starting without an index: {}", e);
                Self::not_ready(config, model_id, e.to_string())
            }
        }
    }

    #[inline]
    pub fn ready(config: &Config, resources: Resources) -> Self {
        Self {
            model_id: resources.embedder.model_id(),
            state: ServingState::Ready(resources),
            top_k: config.retrieval.top_k,
            snippet_chars: config.retrieval.snippet_chars,
            policy: AnswerPolicy::from_config(&config.retrieval),
        }
    }

    #[inline]
    pub fn not_ready(config: &Config, model_id: String, reason: String) -> Self {
        Self {
            state: ServingState::NotReady(reason),
            model_id,
            top_k: config.retrieval.top_k,
            snippet_chars: config.retrieval.snippet_chars,
            policy: AnswerPolicy::from_config(&config.retrieval),
        }
    }

    /// Override the number of neighbors used by [`ServingContext::ask`]
    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ServingState::Ready(_))
    }

    /// Why resources failed to load, if they did
    #[inline]
    pub fn not_ready_reason(&self) -> Option<&str> {
        match &self.state {
            ServingState::Ready(_) => None,
            ServingState::NotReady(reason) => Some(reason),
        }
    }

    /// Number of indexed units, 0 when not ready
    #[inline]
    pub fn unit_count(&self) -> usize {
        match &self.state {
            ServingState::Ready(resources) => resources.units.len(),
            ServingState::NotReady(_) => 0,
        }
    }

    #[inline]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn policy(&self) -> &AnswerPolicy {
        &self.policy
    }

    /// The `k` units closest to `query`, closest first.
    ///
    /// Returns an empty list without embedding anything when not ready.
    #[inline]
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let ServingState::Ready(resources) = &self.state else {
            debug!("Retrieval requested while not ready");
            return Ok(Vec::new());
        };

        let query_embedding = resources.embedder.embed_one(query)?;
        let neighbors = resources.index.search(query_embedding.as_slice(), k)?;

        let results = neighbors
            .into_iter()
            .filter_map(|neighbor| {
                let unit = resources.units.get(neighbor.position)?;
                Some(RetrievalResult {
                    id: unit.id,
                    text: unit.text.clone(),
                    distance: neighbor.distance,
                    source_tag: unit.source_tag.clone(),
                    snippet: snippet(&unit.text, self.snippet_chars),
                })
            })
            .collect::<Vec<_>>();

        debug!(
            "Retrieved {} results, best distance {:?}",
            results.len(),
            results.first().map(|r| r.distance)
        );
        Ok(results)
    }

    /// Retrieve with the configured `top_k` and apply the answer policy.
    ///
    /// Unlike [`ServingContext::retrieve`], a not-ready context is an error.
    #[inline]
    pub fn ask(&self, question: &str) -> Result<Answer> {
        if let Some(reason) = self.not_ready_reason() {
            return Err(RagError::NotReady(reason.to_string()));
        }
        let results = self.retrieve(question, self.top_k)?;
        Ok(self.policy.decide(&results))
    }
}
