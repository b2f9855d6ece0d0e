//! Offline embedding by token hashing.
//!
//! Each distinct whitespace-separated token switches on one bucket of the
//! output vector, chosen by its SHA-256 digest, and the result is scaled to
//! unit length. Texts sharing more tokens land closer together. This is far
//! from a semantic model but it is deterministic, needs no server and keeps
//! the whole pipeline runnable in tests.

use super::types::*;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Token-hashing [`EmbeddingFunction`] that runs entirely in-process.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Creates an embedder producing vectors of `dimension` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is zero.
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be positive");
        Self { dimension }
    }

    fn bucket(&self, token: &str) -> usize {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(prefix) % self.dimension as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let tokens: HashSet<&str> = text.split_whitespace().collect();
        for token in tokens {
            vector[self.bucket(token)] = 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingFunction for HashingEmbedder {
    fn name(&self) -> String {
        format!("hashing:{}", self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}
