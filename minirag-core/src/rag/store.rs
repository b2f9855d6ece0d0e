//! Vector store abstraction and factory.
//!
//! This module provides a collection-oriented interface over vector database
//! implementations. A store owns named collections; each collection is bound
//! to one embedding function and embeds whatever text it is given with it.

use super::lancedb_store::LanceDbStore;
use super::types::{QueryResults, StoredDocument};
use crate::config::StorageConfig;
use crate::provider::{EmbeddingFunction, ProviderError};
use async_trait::async_trait;
use lancedb::arrow::arrow_schema::ArrowError;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by vector store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("LanceDB error: {0}")]
    LanceDb(#[from] lancedb::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid collection name '{0}': expected 3-63 characters of [A-Za-z0-9._-], starting and ending with a letter or digit")]
    InvalidCollectionName(String),

    /// The collection was created with a different embedding function.
    #[error("Collection '{collection}' is bound to embedding function '{existing}', not '{requested}'")]
    EmbeddingFunctionMismatch {
        collection: String,
        existing: String,
        requested: String,
    },

    #[error("Got {documents} documents but {ids} ids")]
    LengthMismatch { documents: usize, ids: usize },

    #[error("Duplicate id '{0}' in batch")]
    DuplicateId(String),

    #[error("Collection expects vectors of dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Number of requested results must be positive")]
    InvalidTopK,

    #[error("Malformed collection data: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Entry point to a vector database holding named collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns the collection called `name`, creating it if absent.
    ///
    /// A new collection is bound to `embedding_function`. An existing one is
    /// reused as-is, but only if it was created with an embedding function of
    /// the same [`name`](EmbeddingFunction::name); otherwise this fails with
    /// [`StoreError::EmbeddingFunctionMismatch`].
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedding_function: Arc<dyn EmbeddingFunction>,
    ) -> Result<Arc<dyn Collection>>;

    /// Returns the names of all collections in the store.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Drops a collection and everything stored in it.
    async fn delete_collection(&self, name: &str) -> Result<()>;
}

/// A named set of documents sharing one embedding function.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Embeds and stores `documents` under the matching `ids`.
    ///
    /// Ids must be unique within the batch. Ids already present in the
    /// collection are skipped and the stored record is kept.
    async fn add(&self, documents: &[String], ids: &[String]) -> Result<()>;

    /// Finds the `n_results` nearest documents for each query text.
    async fn query(&self, query_texts: &[String], n_results: usize) -> Result<QueryResults>;

    /// Fetches stored documents by id. Unknown ids are ignored.
    async fn get(&self, ids: &[String]) -> Result<Vec<StoredDocument>>;

    /// Returns the number of documents in the collection.
    async fn count(&self) -> Result<usize>;
}

/// Opens the vector store described by `storage_config`.
///
/// The store is embedded and persists under `storage_config.path`, which is
/// created on first use.
pub async fn create_vector_store(storage_config: &StorageConfig) -> Result<Arc<dyn VectorStore>> {
    let store = LanceDbStore::new(&storage_config.path, storage_config.distance).await?;
    Ok(Arc::new(store))
}

/// Checks a collection name against the rules shared by every backend.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let invalid = || StoreError::InvalidCollectionName(name.to_string());

    if !(3..=63).contains(&name.len()) {
        return Err(invalid());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(invalid());
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return Err(invalid());
    }
    if name.contains("..") {
        return Err(invalid());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        for name in ["my_rag_collection", "abc", "docs-2024.v1", "A1b"] {
            assert!(validate_collection_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_collection_names() {
        let too_long = "a".repeat(64);
        for name in ["", "ab", "_abc", "abc-", "has space", "a..b", "slash/name", too_long.as_str()] {
            assert!(
                matches!(validate_collection_name(name), Err(StoreError::InvalidCollectionName(_))),
                "{name:?} should be invalid"
            );
        }
    }
}
