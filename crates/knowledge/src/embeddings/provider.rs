//! Embedding provider trait and factory.

use opsdiag_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Deterministic for a given model version: the same text maps to the same
/// vector. Callers must treat failures as errors, never substitute a zero
/// vector.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Generate embeddings for multiple texts (sequential by default).
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

/// Create an embedding provider from configuration.
pub fn create_embedder(
    provider: &str,
    model: &str,
    endpoint: Option<&str>,
    dimensions: usize,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match provider {
        "ollama" => {
            let embedder =
                super::providers::ollama::OllamaEmbedder::new(model, endpoint, dimensions)?;
            Ok(Arc::new(embedder))
        }

        "trigram" => {
            let embedder = super::providers::trigram::TrigramEmbedder::new(dimensions);
            Ok(Arc::new(embedder))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_trigram_embedder() {
        let embedder = create_embedder("trigram", "trigram-v1", None, 384).unwrap();
        assert_eq!(embedder.provider_name(), "trigram");
        assert_eq!(embedder.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_embedder("unknown", "m", None, 384);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_embed_batch_default_impl() {
        let embedder = create_embedder("trigram", "trigram-v1", None, 128).unwrap();
        let texts = vec!["disk full".to_string(), "cpu saturation".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 128);
    }
}
