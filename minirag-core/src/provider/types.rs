//! Common types for embedding providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when interacting with a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Expected embedding dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Turns text into fixed-length vectors.
///
/// A collection is bound to one embedding function when it is created, and
/// every document and query compared inside it must be embedded by a function
/// with the same [`name`](EmbeddingFunction::name). Implementations must be
/// deterministic: the same text always yields the same vector.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Stable identifier recorded on collections created with this function.
    fn name(&self) -> String;

    /// Length of every vector returned by [`embed`](EmbeddingFunction::embed).
    fn dimension(&self) -> usize;

    /// Embeds a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub model: String,
    pub input: Vec<String>,
}

/// Response containing embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub model: String,

    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

/// Checks that a backend returned one vector of the right length per input.
pub(crate) fn check_embeddings(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<()> {
    if embeddings.len() != expected_count {
        return Err(ProviderError::CountMismatch {
            expected: expected_count,
            actual: embeddings.len(),
        });
    }

    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(ProviderError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    Ok(())
}
