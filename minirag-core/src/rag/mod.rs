//! Retrieval operations over normalized text.
//!
//! This module connects the text normalizer to a vector store:
//!
//! - [`get_or_create_collection`]: obtains a named collection bound to an
//!   embedding function
//! - [`add_documents`]: normalizes and ingests a batch of documents
//! - [`query_collection`]: normalizes queries and retrieves nearest documents
//!
//! # How It Works
//!
//! 1. **Ingestion**:
//!    - Each document is lowercased and stripped of punctuation
//!    - The collection embeds the normalized batch with its bound function
//!    - Vectors and text are persisted under the caller's ids
//!
//! 2. **Retrieval**:
//!    - Each query goes through the same normalization
//!    - The collection embeds it and finds the nearest stored vectors
//!    - Matches come back per query, nearest first
//!
//! Normalization happens here and nowhere else, so both paths are guaranteed
//! to use the identical function.

mod lancedb_store;
mod store;
mod types;

pub use lancedb_store::{LanceDbCollection, LanceDbStore};
pub use store::{create_vector_store, validate_collection_name, Collection, StoreError, VectorStore};
pub use types::{QueryMatch, QueryResults, StoredDocument};

use crate::normalize::normalize;
use crate::provider::EmbeddingFunction;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Number of neighbors returned per query when the caller has no preference.
pub const DEFAULT_TOP_K: usize = 2;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Vector store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Returns the collection called `name`, creating it bound to
/// `embedding_function` if it does not exist yet.
///
/// Calling this repeatedly with the same name is harmless and every returned
/// handle refers to the same stored collection.
///
/// # Errors
///
/// Fails with [`StoreError::EmbeddingFunctionMismatch`] when the existing
/// collection was created with a different embedding function, and with
/// [`StoreError::InvalidCollectionName`] for names the store cannot hold.
pub async fn get_or_create_collection(
    store: &dyn VectorStore,
    name: &str,
    embedding_function: Arc<dyn EmbeddingFunction>,
) -> Result<Arc<dyn Collection>> {
    let collection = store.get_or_create_collection(name, embedding_function).await?;
    debug!(collection = name, "Collection ready");
    Ok(collection)
}

/// Normalizes `documents` and stores them under the matching `ids`.
///
/// `documents` and `ids` must have the same length and `ids` must be unique
/// within the call. Ids that are already stored are skipped, leaving the
/// existing document in place.
pub async fn add_documents<D, I>(collection: &dyn Collection, documents: &[D], ids: &[I]) -> Result<()>
where
    D: AsRef<str>,
    I: AsRef<str>,
{
    let normalized: Vec<String> = documents.iter().map(|d| normalize(d.as_ref())).collect();
    let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();

    collection.add(&normalized, &ids).await?;

    info!(collection = collection.name(), count = normalized.len(), "Ingested documents");
    Ok(())
}

/// Normalizes each query and retrieves its `top_k` nearest documents.
///
/// Returns one match list per query text, in input order, each sorted by
/// ascending distance. `top_k` must be positive; asking for more matches
/// than the collection holds returns all of them.
pub async fn query_collection<Q>(
    collection: &dyn Collection,
    query_texts: &[Q],
    top_k: usize,
) -> Result<QueryResults>
where
    Q: AsRef<str>,
{
    let normalized: Vec<String> = query_texts.iter().map(|q| normalize(q.as_ref())).collect();

    let results = collection.query(&normalized, top_k).await?;

    debug!(
        collection = collection.name(),
        queries = normalized.len(),
        top_k,
        "Retrieved matches"
    );
    Ok(results)
}
