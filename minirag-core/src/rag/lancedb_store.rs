//! LanceDB vector database storage implementation.
//!
//! This module provides integration with LanceDB for embedded, in-process
//! vector storage. Each collection is one LanceDB table; the embedding
//! function and distance metric it was created with are kept in the table's
//! schema metadata.

use super::store::{validate_collection_name, Collection, Result, StoreError, VectorStore};
use super::types::{QueryMatch, QueryResults, StoredDocument};
use crate::config::Distance;
use crate::provider::EmbeddingFunction;
use arrow_array::{
    array::{ArrayRef, FixedSizeListArray, Float32Array, StringArray},
    Array, RecordBatch, RecordBatchIterator,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use lancedb::arrow::arrow_schema::{DataType, Field, FieldRef, Schema, SchemaRef};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ID_COLUMN: &str = "id";
const DOCUMENT_COLUMN: &str = "document";
const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";

const EMBEDDING_FUNCTION_KEY: &str = "minirag:embedding_function";
const DISTANCE_KEY: &str = "minirag:distance";

/// LanceDB-based vector store for embedded deployment.
///
/// Provides zero-setup, in-process storage persisted under a local directory.
pub struct LanceDbStore {
    conn: Connection,
    distance: Distance,
}

impl LanceDbStore {
    /// Connects to (or initializes) the database stored at `path`.
    ///
    /// `distance` applies to collections created through this store; existing
    /// collections keep the metric recorded when they were created.
    pub async fn new(path: &str, distance: Distance) -> Result<Self> {
        tokio::fs::create_dir_all(path).await?;
        let conn = connect(path).execute().await?;

        debug!(path, %distance, "Connected to LanceDB");
        Ok(Self { conn, distance })
    }

    fn create_schema(vector_size: usize, embedding_function: &str, distance: Distance) -> SchemaRef {
        let metadata = HashMap::from([
            (EMBEDDING_FUNCTION_KEY.to_string(), embedding_function.to_string()),
            (DISTANCE_KEY.to_string(), distance.as_str().to_string()),
        ]);

        Arc::new(Schema::new_with_metadata(
            vec![
                Field::new(ID_COLUMN, DataType::Utf8, false),
                Field::new(DOCUMENT_COLUMN, DataType::Utf8, false),
                Field::new(
                    VECTOR_COLUMN,
                    DataType::FixedSizeList(
                        Arc::new(Field::new("item", DataType::Float32, true)),
                        vector_size as i32,
                    ),
                    false,
                ),
            ],
            metadata,
        ))
    }
}

#[async_trait]
impl VectorStore for LanceDbStore {
    async fn get_or_create_collection(
        &self,
        name: &str,
        embedding_function: Arc<dyn EmbeddingFunction>,
    ) -> Result<Arc<dyn Collection>> {
        validate_collection_name(name)?;

        let table_names = self.conn.table_names().execute().await?;

        let table = if table_names.iter().any(|t| t == name) {
            self.conn.open_table(name).execute().await?
        } else {
            info!(
                collection = name,
                embedding_function = %embedding_function.name(),
                distance = %self.distance,
                "Creating collection"
            );
            let schema = Self::create_schema(
                embedding_function.dimension(),
                &embedding_function.name(),
                self.distance,
            );
            self.conn.create_empty_table(name, schema).execute().await?
        };

        let collection =
            LanceDbCollection::open(self.conn.clone(), &table, embedding_function, self.distance).await?;
        Ok(Arc::new(collection))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.conn.table_names().execute().await?)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        self.conn.drop_table(name, &[]).await?;
        info!(collection = name, "Deleted collection");
        Ok(())
    }
}

/// Handle to one LanceDB-backed collection.
///
/// The table is reopened for every operation so separate handles on the same
/// collection always observe each other's writes.
pub struct LanceDbCollection {
    conn: Connection,
    name: String,
    embedding_function: Arc<dyn EmbeddingFunction>,
    dimension: usize,
    vector_item: FieldRef,
    distance: Distance,
}

impl LanceDbCollection {
    async fn open(
        conn: Connection,
        table: &Table,
        embedding_function: Arc<dyn EmbeddingFunction>,
        default_distance: Distance,
    ) -> Result<Self> {
        let name = table.name().to_string();
        let schema = table.schema().await?;
        let metadata = schema.metadata();

        if let Some(existing) = metadata.get(EMBEDDING_FUNCTION_KEY) {
            let requested = embedding_function.name();
            if *existing != requested {
                return Err(StoreError::EmbeddingFunctionMismatch {
                    collection: name,
                    existing: existing.clone(),
                    requested,
                });
            }
        }

        let distance = match metadata.get(DISTANCE_KEY) {
            Some(value) => value
                .parse::<Distance>()
                .map_err(|e| StoreError::Malformed(e.to_string()))?,
            None => default_distance,
        };

        let (vector_item, dimension) = match schema.field_with_name(VECTOR_COLUMN)?.data_type() {
            DataType::FixedSizeList(item, size) => (item.clone(), *size as usize),
            other => {
                return Err(StoreError::Malformed(format!(
                    "'{}' column has type {}, expected a fixed size list",
                    VECTOR_COLUMN, other
                )))
            }
        };

        Ok(Self {
            conn,
            name,
            embedding_function,
            dimension,
            vector_item,
            distance,
        })
    }

    async fn table(&self) -> Result<Table> {
        Ok(self.conn.open_table(self.name.as_str()).execute().await?)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embedding_function.embed(texts).await?;

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        Ok(embeddings)
    }

    /// Fetches every stored row whose id is in `ids`.
    async fn rows_with_ids(&self, table: &Table, ids: &[String]) -> Result<Vec<StoredDocument>> {
        let batches: Vec<RecordBatch> = table
            .query()
            .only_if(id_filter(ids))
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut rows = Vec::new();
        for batch in &batches {
            let id_array = string_column(batch, ID_COLUMN)?;
            let document_array = string_column(batch, DOCUMENT_COLUMN)?;

            for i in 0..batch.num_rows() {
                rows.push(StoredDocument::new(id_array.value(i), document_array.value(i)));
            }
        }

        Ok(rows)
    }

    async fn nearest(&self, table: &Table, embedding: &[f32], n_results: usize) -> Result<Vec<QueryMatch>> {
        let batches: Vec<RecordBatch> = table
            .query()
            .limit(n_results)
            .nearest_to(embedding)?
            .column(VECTOR_COLUMN)
            .distance_type(distance_type(self.distance))
            .execute()
            .await?
            .try_collect()
            .await?;

        let mut matches = Vec::new();

        for batch in &batches {
            let id_array = string_column(batch, ID_COLUMN)?;
            let document_array = string_column(batch, DOCUMENT_COLUMN)?;
            let distance_array = batch
                .column_by_name(DISTANCE_COLUMN)
                .ok_or_else(|| StoreError::Malformed(format!("missing '{}' column", DISTANCE_COLUMN)))?
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| StoreError::Malformed(format!("'{}' is not a float column", DISTANCE_COLUMN)))?;

            for i in 0..batch.num_rows() {
                matches.push(QueryMatch {
                    id: id_array.value(i).to_string(),
                    document: document_array.value(i).to_string(),
                    distance: distance_array.value(i),
                });
            }
        }

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(n_results);
        Ok(matches)
    }
}

#[async_trait]
impl Collection for LanceDbCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, documents: &[String], ids: &[String]) -> Result<()> {
        if documents.len() != ids.len() {
            return Err(StoreError::LengthMismatch {
                documents: documents.len(),
                ids: ids.len(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(StoreError::DuplicateId(duplicate.clone()));
        }

        if ids.is_empty() {
            return Ok(());
        }

        let table = self.table().await?;
        let existing: HashSet<String> = self
            .rows_with_ids(&table, ids)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();

        let (new_documents, new_ids): (Vec<String>, Vec<String>) = documents
            .iter()
            .zip(ids)
            .filter(|(_, id)| {
                let present = existing.contains(id.as_str());
                if present {
                    warn!(collection = %self.name, id = %id, "Id already exists, skipping document");
                }
                !present
            })
            .map(|(document, id)| (document.clone(), id.clone()))
            .unzip();

        if new_ids.is_empty() {
            return Ok(());
        }

        let embeddings = self.embed(&new_documents).await?;
        let added = new_ids.len();

        let schema = table.schema().await?;
        let vector_values = Float32Array::from(embeddings.into_iter().flatten().collect::<Vec<f32>>());
        let vector_array = FixedSizeListArray::try_new(
            self.vector_item.clone(),
            self.dimension as i32,
            Arc::new(vector_values),
            None,
        )?;

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(new_ids)) as ArrayRef,
                Arc::new(StringArray::from(new_documents)) as ArrayRef,
                Arc::new(vector_array) as ArrayRef,
            ],
        )?;

        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table.add(reader).execute().await?;

        info!(collection = %self.name, added, skipped = ids.len() - added, "Added documents");
        Ok(())
    }

    async fn query(&self, query_texts: &[String], n_results: usize) -> Result<QueryResults> {
        if n_results == 0 {
            return Err(StoreError::InvalidTopK);
        }
        if query_texts.is_empty() {
            return Ok(QueryResults::default());
        }

        let table = self.table().await?;
        if table.count_rows(None).await? == 0 {
            debug!(collection = %self.name, "Collection is empty, returning no matches");
            return Ok(QueryResults::new(vec![Vec::new(); query_texts.len()]));
        }

        let embeddings = self.embed(query_texts).await?;

        let mut matches = Vec::with_capacity(embeddings.len());
        for (text, embedding) in query_texts.iter().zip(&embeddings) {
            let found = self.nearest(&table, embedding, n_results).await?;
            debug!(collection = %self.name, query = %text, matches = found.len(), "Query complete");
            matches.push(found);
        }

        Ok(QueryResults::new(matches))
    }

    async fn get(&self, ids: &[String]) -> Result<Vec<StoredDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let table = self.table().await?;
        let mut by_id: HashMap<String, StoredDocument> = self
            .rows_with_ids(&table, ids)
            .await?
            .into_iter()
            .map(|row| (row.id.clone(), row))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn count(&self) -> Result<usize> {
        let table = self.table().await?;
        Ok(table.count_rows(None).await?)
    }
}

fn distance_type(distance: Distance) -> DistanceType {
    match distance {
        Distance::L2 => DistanceType::L2,
        Distance::Cosine => DistanceType::Cosine,
        Distance::Ip => DistanceType::Dot,
    }
}

/// Builds an SQL `IN` filter over the id column, quoting each id.
fn id_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect();
    format!("{} IN ({})", ID_COLUMN, quoted.join(", "))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::Malformed(format!("missing '{}' column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StoreError::Malformed(format!("'{}' is not a string column", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{HashingEmbedder, ProviderError};
    use tempfile::TempDir;

    /// Claims one dimension but returns vectors of another.
    struct WrongDimensionEmbedder;

    #[async_trait]
    impl EmbeddingFunction for WrongDimensionEmbedder {
        fn name(&self) -> String {
            "wrong-dimension".to_string()
        }

        fn dimension(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn hashing() -> Arc<dyn EmbeddingFunction> {
        Arc::new(HashingEmbedder::new(64))
    }

    async fn open_store(dir: &TempDir, distance: Distance) -> LanceDbStore {
        LanceDbStore::new(dir.path().to_str().unwrap(), distance)
            .await
            .unwrap()
    }

    async fn seeded_collection(store: &LanceDbStore) -> Arc<dyn Collection> {
        let collection = store.get_or_create_collection("test_docs", hashing()).await.unwrap();
        collection
            .add(
                &strings(&["red apples and green pears", "fast cars on wide roads", "quiet snowy mountain peaks"]),
                &strings(&["a", "b", "c"]),
            )
            .await
            .unwrap();
        collection
    }

    #[test]
    fn test_id_filter_escapes_quotes() {
        assert_eq!(id_filter(&strings(&["a", "it's"])), "id IN ('a', 'it''s')");
    }

    #[test]
    fn test_schema_records_binding() {
        let schema = LanceDbStore::create_schema(8, "hashing:8", Distance::Cosine);
        assert_eq!(schema.metadata().get(EMBEDDING_FUNCTION_KEY).map(String::as_str), Some("hashing:8"));
        assert_eq!(schema.metadata().get(DISTANCE_KEY).map(String::as_str), Some("cosine"));
        assert_eq!(schema.fields().len(), 3);
    }

    #[tokio::test]
    async fn test_get_or_create_shares_collection() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;

        let first = store.get_or_create_collection("shared", hashing()).await.unwrap();
        let second = store.get_or_create_collection("shared", hashing()).await.unwrap();

        first.add(&strings(&["hello world"]), &strings(&["doc0"])).await.unwrap();

        assert_eq!(second.count().await.unwrap(), 1);
        assert_eq!(
            second.get(&strings(&["doc0"])).await.unwrap(),
            vec![StoredDocument::new("doc0", "hello world")]
        );
        assert_eq!(store.list_collections().await.unwrap(), vec!["shared".to_string()]);
    }

    #[tokio::test]
    async fn test_persists_across_store_instances() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir, Distance::L2).await;
            seeded_collection(&store).await;
        }

        let reopened = open_store(&dir, Distance::L2).await;
        let collection = reopened.get_or_create_collection("test_docs", hashing()).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_rejects_different_embedding_function() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        store.get_or_create_collection("bound", hashing()).await.unwrap();

        let result = store
            .get_or_create_collection("bound", Arc::new(HashingEmbedder::new(32)))
            .await;
        assert!(matches!(result, Err(StoreError::EmbeddingFunctionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_rejects_invalid_name() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let result = store.get_or_create_collection("x", hashing()).await;
        assert!(matches!(result, Err(StoreError::InvalidCollectionName(_))));
    }

    #[tokio::test]
    async fn test_add_validates_batch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = store.get_or_create_collection("checked", hashing()).await.unwrap();

        let mismatch = collection.add(&strings(&["one", "two"]), &strings(&["a"])).await;
        assert!(matches!(mismatch, Err(StoreError::LengthMismatch { documents: 2, ids: 1 })));

        let duplicate = collection.add(&strings(&["one", "two"]), &strings(&["a", "a"])).await;
        assert!(matches!(duplicate, Err(StoreError::DuplicateId(ref id)) if id == "a"));

        assert_eq!(collection.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_skips_existing_ids() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = seeded_collection(&store).await;

        collection
            .add(&strings(&["replacement text", "brand new"]), &strings(&["a", "d"]))
            .await
            .unwrap();

        assert_eq!(collection.count().await.unwrap(), 4);
        let stored = collection.get(&strings(&["a", "d"])).await.unwrap();
        assert_eq!(stored[0].document, "red apples and green pears");
        assert_eq!(stored[1].document, "brand new");
    }

    #[tokio::test]
    async fn test_add_empty_batch_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = store.get_or_create_collection("empty_add", hashing()).await.unwrap();
        collection.add(&[], &[]).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_exact_text_is_nearest() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = seeded_collection(&store).await;

        let results = collection
            .query(&strings(&["fast cars on wide roads"]), 1)
            .await
            .unwrap();
        let top = &results.for_query(0).unwrap()[0];
        assert_eq!(top.id, "b");
        assert!(top.distance.abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_query_limits_and_orders_results() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = seeded_collection(&store).await;

        let results = collection
            .query(&strings(&["green apples", "snowy peaks"]), 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        for matches in results.iter() {
            assert!(matches.len() <= 2);
            assert!(matches.windows(2).all(|w| w[0].distance <= w[1].distance));
        }

        // Asking for more than the collection holds returns everything.
        let all = collection.query(&strings(&["roads"]), 10).await.unwrap();
        assert_eq!(all.for_query(0).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_query_edge_cases() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = store.get_or_create_collection("edges", hashing()).await.unwrap();

        let zero = collection.query(&strings(&["anything"]), 0).await;
        assert!(matches!(zero, Err(StoreError::InvalidTopK)));

        let no_queries = collection.query(&[], 2).await.unwrap();
        assert!(no_queries.is_empty());

        let empty = collection.query(&strings(&["anything", "else"]), 2).await.unwrap();
        assert_eq!(empty.len(), 2);
        assert!(empty.iter().all(|m| m.is_empty()));
    }

    #[tokio::test]
    async fn test_cosine_collection_keeps_metric() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir, Distance::Cosine).await;
            seeded_collection(&store).await;
        }

        // Reopening with a different default keeps the recorded metric.
        let store = open_store(&dir, Distance::L2).await;
        let collection = store.get_or_create_collection("test_docs", hashing()).await.unwrap();
        let results = collection
            .query(&strings(&["quiet snowy mountain peaks"]), 1)
            .await
            .unwrap();
        let top = &results.for_query(0).unwrap()[0];
        assert_eq!(top.id, "c");
        assert!(top.distance.abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = store
            .get_or_create_collection("wrong_dims", Arc::new(WrongDimensionEmbedder))
            .await
            .unwrap();

        let result = collection.add(&strings(&["text"]), &strings(&["a"])).await;
        assert!(matches!(result, Err(StoreError::DimensionMismatch { expected: 4, actual: 3 })));
    }

    #[tokio::test]
    async fn test_get_preserves_requested_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        let collection = seeded_collection(&store).await;

        let stored = collection.get(&strings(&["c", "missing", "a"])).await.unwrap();
        let ids: Vec<&str> = stored.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(collection.get(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Distance::L2).await;
        seeded_collection(&store).await;

        store.delete_collection("test_docs").await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());

        let recreated = store.get_or_create_collection("test_docs", hashing()).await.unwrap();
        assert_eq!(recreated.count().await.unwrap(), 0);
    }
}
