//! Vector index abstraction for fault-knowledge records.
//!
//! Defines a backend-agnostic trait for persistent similarity storage.

use crate::types::{IndexedRecord, SearchHit};
use opsdiag_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must persist records across process restarts and keep at
/// most one record per id. Search returns hits in the backend's
/// nearest-first order; that order is the ranking, callers must not re-sort.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the record with the given id.
    ///
    /// Backends without native upsert implement delete-then-insert; a search
    /// racing an upsert may briefly miss the id, which is tolerated.
    async fn upsert(&mut self, record: &IndexedRecord) -> AppResult<()>;

    /// Remove the record with the given id. No-op when absent.
    async fn delete(&mut self, id: &str) -> AppResult<()>;

    /// Nearest-neighbor search by cosine distance, returning up to `top_k`
    /// hits in nearest-first order.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>>;

    /// Number of records currently in the index.
    async fn count(&self) -> AppResult<usize>;
}
