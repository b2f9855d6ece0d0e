//! Embedding provider abstraction layer.
//!
//! This module defines a common interface for the backends that turn text
//! into vectors (Ollama, offline token hashing) and a factory that picks one
//! from configuration.

mod types;
pub mod hashing;
pub mod ollama;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use std::sync::Arc;

// Re-export common types
pub use types::{
    EmbedRequest,
    EmbedResponse,
    EmbeddingFunction,
    ProviderError,
    Result,
};

// Re-export provider implementations
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

/// Creates the embedding function described by `config`.
///
/// The returned handle is meant to be built once per run and passed to every
/// collection that should share its vector space.
pub fn create_embedding_function(config: &EmbeddingConfig) -> Arc<dyn EmbeddingFunction> {
    match config.provider {
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbedder::from_config(config)),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedder::new(config.dimension)),
    }
}
