//! Retrieval service: embedder + vector index behind one interface.
//!
//! Turns knowledge entries into index records and query text into ranked
//! matches. Constructed once at startup and shared across requests; the
//! embedder and index handles are safe for concurrent reads, while index
//! mutation is serialized behind a write lock (mutation is low-frequency,
//! driven by knowledge CRUD and the batch sync job).

use crate::embeddings::EmbeddingProvider;
use crate::types::{IndexedRecord, KnowledgeEntry, RankedMatch};
use crate::vector_index::VectorIndex;
use opsdiag_core::AppResult;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Retrieval service over an embedding provider and a vector index.
pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: RwLock<Box<dyn VectorIndex>>,
}

impl RetrievalService {
    /// Create a new retrieval service.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Box<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index: RwLock::new(index),
        }
    }

    /// Embed an entry's symptoms text and upsert it into the index.
    ///
    /// Used both for mirroring individual knowledge mutations and by the
    /// batch sync job. Embedding failures propagate — a zero vector is never
    /// substituted.
    pub async fn upsert_entry(&self, entry: &KnowledgeEntry) -> AppResult<()> {
        let embedding = self.embedder.embed(&entry.symptoms).await?;
        let record = IndexedRecord::from_entry(entry, embedding);

        let mut index = self.index.write().await;
        index.upsert(&record).await?;

        tracing::info!(id = entry.id, title = %entry.title, "Indexed knowledge entry");
        Ok(())
    }

    /// Remove an entry from the index. No-op when absent.
    pub async fn delete_entry(&self, id: i64) -> AppResult<()> {
        let mut index = self.index.write().await;
        index.delete(&id.to_string()).await?;
        tracing::info!(id, "Removed knowledge entry from index");
        Ok(())
    }

    /// Search the index with free text, returning up to `top_k` ranked
    /// matches in the engine's nearest-first order.
    ///
    /// This method never fails: embedding or index errors are logged with
    /// the query and degrade to an empty result, so the retrieval-
    /// augmentation step can never abort a diagnosis request. Every call
    /// re-embeds the query; results are not cached.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<RankedMatch> {
        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::error!(query, "Failed to embed query: {}", e);
                return Vec::new();
            }
        };

        let index = self.index.read().await;
        let hits = match index.search(&query_embedding, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!(query, "Vector search failed: {}", e);
                return Vec::new();
            }
        };

        let matches: Vec<RankedMatch> = hits.into_iter().map(RankedMatch::from_hit).collect();

        tracing::info!(
            "Found {} matches with scores: {:?}",
            matches.len(),
            matches.iter().map(|m| m.score).collect::<Vec<_>>()
        );

        matches
    }

    /// Number of records in the index.
    pub async fn count(&self) -> AppResult<usize> {
        let index = self.index.read().await;
        index.count().await
    }

    /// The embedding provider in use.
    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }
}
