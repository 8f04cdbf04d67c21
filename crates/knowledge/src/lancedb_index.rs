//! LanceDB-backed vector index implementation.
//!
//! Directory-backed persistent store keyed by the fixed collection name,
//! one record per knowledge id: embedding, metadata columns, and the
//! symptoms document text.

use crate::types::{IndexedRecord, SearchHit};
use crate::vector_index::VectorIndex;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use opsdiag_core::{AppError, AppResult};
use std::path::Path;
use std::sync::Arc;

/// LanceDB-backed vector index for fault-knowledge records.
pub struct LanceDbIndex {
    table: Table,
    embedding_dim: usize,
}

impl LanceDbIndex {
    /// Create or open a LanceDB index at the specified path.
    ///
    /// # Arguments
    /// * `db_path` - Directory path for the LanceDB database
    /// * `table_name` - Name of the table (the collection name)
    /// * `embedding_dim` - Dimension of embedding vectors (e.g., 768)
    pub async fn open(db_path: &Path, table_name: &str, embedding_dim: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Index(format!("Failed to create index directory: {}", e))
            })?;
        }

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.contains(&table_name.to_string()) {
            conn.open_table(table_name)
                .execute()
                .await
                .map_err(|e| AppError::Index(format!("Failed to open table: {}", e)))?
        } else {
            let schema = Self::create_schema(embedding_dim);
            let empty_batch = RecordBatch::new_empty(schema.clone());

            conn.create_table(
                table_name,
                RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Initialized LanceDB index at {:?}", db_path);

        Ok(Self {
            table,
            embedding_dim,
        })
    }

    /// Arrow schema for the fault-knowledge table.
    fn create_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("knowledge_id", DataType::Int64, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("solution", DataType::Utf8, false),
            Field::new("symptoms", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
        ]))
    }

    /// Convert an IndexedRecord to a single-row Arrow RecordBatch.
    fn record_to_batch(&self, record: &IndexedRecord) -> AppResult<RecordBatch> {
        if record.embedding.len() != self.embedding_dim {
            return Err(AppError::Index(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                record.embedding.len()
            )));
        }

        let schema = Self::create_schema(self.embedding_dim);

        let embedding_values = Float32Array::from(record.embedding.clone());
        let embedding_array = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.embedding_dim as i32,
            Arc::new(embedding_values),
            None,
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![record.id.as_str()])),
                Arc::new(Int64Array::from(vec![record.knowledge_id])),
                Arc::new(StringArray::from(vec![record.category.as_str()])),
                Arc::new(StringArray::from(vec![record.title.as_str()])),
                Arc::new(StringArray::from(vec![record.solution.as_str()])),
                Arc::new(StringArray::from(vec![record.symptoms.as_str()])),
                Arc::new(embedding_array),
            ],
        )
        .map_err(|e| AppError::Index(format!("Failed to create RecordBatch: {}", e)))
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
        let idx = batch
            .schema()
            .index_of(name)
            .map_err(|e| AppError::Index(format!("Missing column {}: {}", name, e)))?;
        batch
            .column(idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| AppError::Index(format!("Invalid {} column", name)))
    }
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    async fn upsert(&mut self, record: &IndexedRecord) -> AppResult<()> {
        let batch = self.record_to_batch(record)?;

        // No native upsert in this engine version: delete-then-insert. A
        // concurrent search may briefly miss the id in between.
        self.delete(&record.id).await?;

        self.table
            .add(RecordBatchIterator::new(
                vec![Ok(batch.clone())],
                batch.schema(),
            ))
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to add record: {}", e)))?;

        tracing::debug!(id = %record.id, title = %record.title, "Upserted index record");
        Ok(())
    }

    async fn delete(&mut self, id: &str) -> AppResult<()> {
        // ids are stringified integers; no quoting hazards
        self.table
            .delete(&format!("id = '{}'", id))
            .await
            .map_err(|e| AppError::Index(format!("Failed to delete record {}: {}", id, e)))?;
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>> {
        if query_embedding.len() != self.embedding_dim {
            return Err(AppError::Index(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                query_embedding.len()
            )));
        }

        let batches = self
            .table
            .query()
            .nearest_to(query_embedding.to_vec())
            .map_err(|e| AppError::Index(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| AppError::Index(format!("Failed to execute search: {}", e)))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| AppError::Index(format!("Failed to collect results: {}", e)))?;

        let mut hits = Vec::new();

        // Rows arrive nearest-first; keep that order as the ranking
        for batch in &batches {
            let knowledge_id_idx = batch
                .schema()
                .index_of("knowledge_id")
                .map_err(|e| AppError::Index(format!("Missing knowledge_id column: {}", e)))?;
            let knowledge_ids = batch
                .column(knowledge_id_idx)
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| AppError::Index("Invalid knowledge_id column".to_string()))?;

            let categories = Self::string_column(batch, "category")?;
            let titles = Self::string_column(batch, "title")?;
            let solutions = Self::string_column(batch, "solution")?;
            let symptoms = Self::string_column(batch, "symptoms")?;

            let distance_idx = batch
                .schema()
                .index_of("_distance")
                .map_err(|e| AppError::Index(format!("Missing _distance column: {}", e)))?;
            let distances = batch
                .column(distance_idx)
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| AppError::Index("Invalid _distance column".to_string()))?;

            for row in 0..batch.num_rows() {
                hits.push(SearchHit {
                    knowledge_id: knowledge_ids.value(row),
                    category: categories.value(row).to_string(),
                    title: titles.value(row).to_string(),
                    solution: solutions.value(row).to_string(),
                    symptoms: symptoms.value(row).to_string(),
                    distance: distances.value(row),
                });
            }
        }

        tracing::debug!("Retrieved {} hits (requested top-{})", hits.len(), top_k);
        Ok(hits)
    }

    async fn count(&self) -> AppResult<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Index(format!("Failed to count rows: {}", e)))
    }
}
