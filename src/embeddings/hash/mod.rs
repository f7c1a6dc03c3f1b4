
use tracing::debug;

use super::{Embedder, Embedding};
use crate::Result;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder.
///
/// Lowercased words and their padded character trigrams are hashed into a
/// fixed number of signed buckets and the result is L2-normalized. Needs no
/// model download, so it serves offline setups and tests. Similarity is
/// lexical, not semantic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0_f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            self.accumulate(&mut values, word.as_bytes(), WORD_WEIGHT);

            let padded: Vec<char> = std::iter::once(' ')
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut values, trigram.as_bytes(), TRIGRAM_WEIGHT);
            }
        }

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut values {
                *value /= norm;
            }
        }

        values
    }

    fn accumulate(&self, values: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        // Bucket from the low bits, sign from the top bit
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        values[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

impl Embedder for HashEmbedder {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        debug!("Hashing {} texts into {} buckets", texts.len(), self.dimension);
        Ok(texts
            .iter()
            .map(|text| Embedding::new(self.vectorize(text)))
            .collect())
    }

    #[inline]
    fn model_id(&self) -> String {
        format!("hash:trigram-{}", self.dimension)
    }
}
