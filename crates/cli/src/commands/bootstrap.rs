//! Shared construction of the retrieval stack.

use opsdiag_core::{AppConfig, AppResult, INDEX_COLLECTION};
use opsdiag_knowledge::{create_embedder, LanceDbIndex, RetrievalService};
use std::sync::Arc;

/// Build the retrieval service from configuration: embedder plus the
/// persistent vector index under the data directory.
pub async fn build_retrieval(config: &AppConfig) -> AppResult<Arc<RetrievalService>> {
    let embedder = create_embedder(
        &config.embedding.provider,
        &config.embedding.model,
        config.embedding.endpoint.as_deref(),
        config.embedding.dimension,
    )?;

    let index = LanceDbIndex::open(
        &config.index_dir(),
        INDEX_COLLECTION,
        config.embedding.dimension,
    )
    .await?;

    Ok(Arc::new(RetrievalService::new(embedder, Box::new(index))))
}
