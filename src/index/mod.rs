//! Exact nearest-neighbor search over embedded text units.
//!
//! [`FlatIndex`] keeps every vector in one row-major buffer and answers
//! queries by scanning all of them under squared Euclidean distance. Row `n`
//! of the index always belongs to text unit `n`.

pub mod consistency;
pub mod store;


use std::cmp::Ordering;

use tracing::debug;

use crate::embeddings::Embedding;
use crate::{RagError, Result};

pub use consistency::ConsistencyReport;
pub use store::{ArtifactStore, IndexHeader, LoadedArtifacts};

/// One search hit: the row position and its squared L2 distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

impl Neighbor {
    fn rank(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` values.
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Index(
                "Index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Build an index over `embeddings`, keeping their order as row positions.
    ///
    /// The dimension is taken from the first embedding, every other embedding
    /// must match it.
    #[inline]
    pub fn build(embeddings: &[Embedding]) -> Result<Self> {
        let first = embeddings.first().ok_or_else(|| {
            RagError::Index("Cannot build an index from zero vectors".to_string())
        })?;

        let mut index = Self::new(first.dimension())?;
        index.data.reserve(embeddings.len() * index.dimension);
        for embedding in embeddings {
            index.add(embedding.as_slice())?;
        }

        debug!(
            "Built flat index with {} vectors of dimension {}",
            index.len(),
            index.dimension
        );
        Ok(index)
    }

    /// Rebuild an index from its row-major buffer.
    #[inline]
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Index(
                "Index dimension must be greater than zero".to_string(),
            ));
        }
        if data.len() % dimension != 0 {
            return Err(RagError::Index(format!(
                "Vector buffer of {} values is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Append one vector as the next row
    #[inline]
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector.len())?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Return the `min(k, len)` nearest rows to `query`, closest first.
    ///
    /// Equal distances are ordered by row position.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimension(query.len())?;
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .collect();

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, Neighbor::rank);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(Neighbor::rank);

        Ok(neighbors)
    }

    /// The vector stored at `position`
    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dimension).nth(position)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major vector data, `len() * dimension()` values
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual == self.dimension {
            Ok(())
        } else {
            Err(RagError::Index(format!(
                "Vector dimension {} does not match index dimension {}",
                actual, self.dimension
            )))
        }
    }
}

/// Squared Euclidean distance between two equal-length vectors
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}
