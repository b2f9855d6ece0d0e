//! End-to-end demonstration: ingest a fixed sample set and run one query.

use crate::config::Config;
use crate::provider::EmbeddingFunction;
use crate::rag::{self, QueryResults, VectorStore};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Documents ingested by [`run`], stored under ids `doc0`..`doc4`.
pub const SAMPLE_DOCUMENTS: [&str; 5] = [
    "The Eiffel Tower is located in Paris.",
    "The Great Wall of China is one of the seven wonders of the world.",
    "The Mona Lisa was painted by Leonardo da Vinci.",
    "The Amazon rainforest is the largest tropical rainforest in the world.",
    "Mount Everest is the highest mountain above sea level.",
];

/// Sequential ids for `count` documents: `doc0`, `doc1`, ...
pub fn sample_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("doc{}", i)).collect()
}

/// What a demonstration run did, ready to print.
#[derive(Debug, Clone)]
pub struct DemoOutcome {
    pub collection: String,
    pub added: usize,
    pub results: QueryResults,
}

impl fmt::Display for DemoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Added {} documents to the collection '{}'.",
            self.added, self.collection
        )?;
        writeln!(f)?;
        writeln!(f, "Query Results:")?;

        match self.results.for_query(0) {
            Some(matches) if !matches.is_empty() => {
                for (i, m) in matches.iter().enumerate() {
                    writeln!(f, "  Result {}: {}", i + 1, m.document)?;
                    writeln!(f, "  Distance: {:.4}", m.distance)?;
                }
            }
            _ => writeln!(f, "No results found or error in query.")?,
        }

        Ok(())
    }
}

/// Runs the demonstration against the configured collection.
///
/// The collection is created if needed, the sample documents are ingested
/// (ids already present are left alone, so reruns are harmless) and the
/// configured query is answered with `config.demo.top_k` matches.
pub async fn run(
    config: &Config,
    store: &dyn VectorStore,
    embedding_function: Arc<dyn EmbeddingFunction>,
) -> rag::Result<DemoOutcome> {
    let name = &config.storage.collection_name;
    let collection = rag::get_or_create_collection(store, name, embedding_function).await?;

    let ids = sample_ids(SAMPLE_DOCUMENTS.len());
    rag::add_documents(collection.as_ref(), &SAMPLE_DOCUMENTS, &ids).await?;

    let results = rag::query_collection(collection.as_ref(), &[&config.demo.query], config.demo.top_k).await?;
    info!(collection = %name, query = %config.demo.query, "Demo query complete");

    Ok(DemoOutcome {
        collection: name.clone(),
        added: SAMPLE_DOCUMENTS.len(),
        results,
    })
}
