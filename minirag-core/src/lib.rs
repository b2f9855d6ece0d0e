//! minirag-core - Minimal retrieval engine
//!
//! Provides the building blocks for a small retrieval-augmented setup:
//! - Text normalization shared by ingestion and retrieval
//! - Embedding provider abstraction (Ollama, offline hashing)
//! - Persistent vector collections backed by LanceDB
//! - Configuration management
//!
//! ## Primary API
//!
//! Build an embedding function and a vector store once, then use the
//! functions in [`rag`] to add and query documents. [`demo::run`] wires the
//! whole flow together.

// Public modules
pub mod config;
pub mod demo;
pub mod detection;
pub mod normalize;
pub mod provider;
pub mod rag;

// Public exports
pub use config::{Config, ConfigError};
pub use detection::{check_ollama_silent, detect_ollama, DetectionError, OllamaInfo};
pub use normalize::normalize;

// Provider exports
pub use provider::{create_embedding_function, EmbeddingFunction, HashingEmbedder, OllamaEmbedder, ProviderError};

// Retrieval exports
pub use rag::{
    add_documents, create_vector_store, get_or_create_collection, query_collection, Collection, QueryMatch,
    QueryResults, RagError, StoreError, VectorStore,
};
