//! Deterministic hash-seeded embeddings
//!
//! Used when no embedding provider is configured. Vectors carry no semantic
//! meaning but are stable across calls, instances and processes.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use sha2::{Digest, Sha256};

use crate::error::Result;

use super::embedding::EmbeddingProvider;

/// Fallback embedder: SHA-256 seed, standard-normal draws, L2 normalization
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Vector for one text
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed(text));
        let mut v: Vec<f32> = (0..self.dimensions)
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        l2_normalize(&mut v);
        v
    }
}

/// First 8 bytes of SHA-256(text), big-endian
fn seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash-fallback"
    }
}
