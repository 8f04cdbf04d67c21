//! Batch sync job: knowledge store -> vector index.
//!
//! Rebuilds the index from the system of record. Per-entry failures are
//! logged with the entry's title and do not abort the batch; the job is
//! at-least-effort, not transactional.

use crate::retrieval::RetrievalService;
use crate::store::KnowledgeStore;
use opsdiag_core::AppResult;
use serde::Serialize;

/// Outcome of syncing one knowledge entry.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub id: i64,
    pub title: String,
    /// Failure message when the upsert did not succeed
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
    pub outcomes: Vec<SyncOutcome>,
}

/// Walk all knowledge entries and upsert each into the vector index.
///
/// Fails only when the store cannot be enumerated at all; individual entry
/// failures are recorded in the report and logged.
pub async fn sync_all(
    store: &dyn KnowledgeStore,
    retrieval: &RetrievalService,
) -> AppResult<SyncReport> {
    let entries = store.list_all()?;
    let total = entries.len();

    tracing::info!("Syncing {} knowledge entries into the vector index", total);

    let mut outcomes = Vec::with_capacity(total);
    let mut synced = 0usize;
    let mut failed = 0usize;

    for entry in &entries {
        match retrieval.upsert_entry(entry).await {
            Ok(()) => {
                synced += 1;
                outcomes.push(SyncOutcome {
                    id: entry.id,
                    title: entry.title.clone(),
                    error: None,
                });
            }
            Err(e) => {
                failed += 1;
                tracing::error!(title = %entry.title, "Failed to sync knowledge entry: {}", e);
                outcomes.push(SyncOutcome {
                    id: entry.id,
                    title: entry.title.clone(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    tracing::info!("Sync completed: {}/{} entries indexed, {} failed", synced, total, failed);

    Ok(SyncReport {
        total,
        synced,
        failed,
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::provider::EmbeddingProvider;
    use crate::embeddings::providers::trigram::TrigramEmbedder;
    use crate::lancedb_index::LanceDbIndex;
    use crate::store::SqliteKnowledgeStore;
    use opsdiag_core::{AppError, AppResult};
    use std::sync::Arc;
    use tempfile::TempDir;

    const DIM: usize = 384;

    /// Embedder that fails for texts containing a poison marker.
    #[derive(Debug)]
    struct FlakyEmbedder {
        inner: TrigramEmbedder,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        fn provider_name(&self) -> &str {
            "flaky"
        }

        fn model_name(&self) -> &str {
            "flaky-v1"
        }

        fn dimensions(&self) -> usize {
            DIM
        }

        async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
            if text.contains("POISON") {
                return Err(AppError::Embedding("model unavailable".to_string()));
            }
            self.inner.embed(text).await
        }
    }

    fn seeded_store(dir: &TempDir) -> SqliteKnowledgeStore {
        let store = SqliteKnowledgeStore::open(&dir.path().join("knowledge.db")).unwrap();
        let cat = store.create_category("network", "").unwrap();
        store
            .create_entry(cat, "DNS outage", "resolution timeouts", "restart resolver")
            .unwrap();
        store
            .create_entry(cat, "Broken entry", "POISON symptoms", "n/a")
            .unwrap();
        store
            .create_entry(cat, "Disk full", "no space left on device", "extend volume")
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_sync_tolerates_per_entry_failures() {
        let dir = TempDir::new().unwrap();
        let store = seeded_store(&dir);

        let embedder = Arc::new(FlakyEmbedder {
            inner: TrigramEmbedder::new(DIM),
        });
        let index = LanceDbIndex::open(&dir.path().join("index"), "fault_knowledge", DIM)
            .await
            .unwrap();
        let retrieval = RetrievalService::new(embedder, Box::new(index));

        let report = sync_all(&store, &retrieval).await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 1);

        let failures: Vec<_> = report.outcomes.iter().filter(|o| !o.succeeded()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].title, "Broken entry");

        // The surviving entries are searchable
        assert_eq!(retrieval.count().await.unwrap(), 2);
        let matches = retrieval.search("resolution timeouts", 3).await;
        assert_eq!(matches[0].title, "DNS outage");
    }

    #[tokio::test]
    async fn test_sync_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = SqliteKnowledgeStore::open(&dir.path().join("knowledge.db")).unwrap();

        let embedder = Arc::new(TrigramEmbedder::new(DIM));
        let index = LanceDbIndex::open(&dir.path().join("index"), "fault_knowledge", DIM)
            .await
            .unwrap();
        let retrieval = RetrievalService::new(embedder, Box::new(index));

        let report = sync_all(&store, &retrieval).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.synced, 0);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_sync_is_rerunnable() {
        let dir = TempDir::new().unwrap();
        let store = SqliteKnowledgeStore::open(&dir.path().join("knowledge.db")).unwrap();
        let cat = store.create_category("database", "").unwrap();
        store
            .create_entry(cat, "Slow queries", "high read latency", "rebuild indexes")
            .unwrap();

        let embedder = Arc::new(TrigramEmbedder::new(DIM));
        let index = LanceDbIndex::open(&dir.path().join("index"), "fault_knowledge", DIM)
            .await
            .unwrap();
        let retrieval = RetrievalService::new(embedder, Box::new(index));

        sync_all(&store, &retrieval).await.unwrap();
        sync_all(&store, &retrieval).await.unwrap();

        // Upsert semantics: re-running does not duplicate records
        assert_eq!(retrieval.count().await.unwrap(), 1);
    }
}
