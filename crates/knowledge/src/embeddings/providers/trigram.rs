//! Trigram embedding provider.
//!
//! Deterministic, offline text-to-vector mapping built from character
//! trigrams and word frequencies. Not semantically accurate like a neural
//! model, but consistent and content-dependent, which makes it suitable for
//! tests and air-gapped development.

use crate::embeddings::provider::EmbeddingProvider;
use opsdiag_core::{AppError, AppResult};

/// Trigram-based embedding provider.
#[derive(Debug)]
pub struct TrigramEmbedder {
    dimensions: usize,
}

impl TrigramEmbedder {
    /// Create a new trigram embedder with the specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];

        let lower = text.to_lowercase();

        // Filter stop words for better discrimination
        let stop_words: std::collections::HashSet<&str> = [
            "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to",
            "of", "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have",
            "has", "had", "it", "its", "their", "they", "them",
        ]
        .iter()
        .copied()
        .collect();

        let words: Vec<&str> = lower
            .split_whitespace()
            .filter(|w| !stop_words.contains(w) && w.len() > 2)
            .collect();

        let mut word_freq = std::collections::HashMap::new();
        for word in &words {
            *word_freq.entry(*word).or_insert(0) += 1;
        }

        // Spread each word over several dimensions via its character
        // trigrams; sqrt-scaled frequency keeps common words from dominating
        for (word, freq) in word_freq.iter() {
            let chars: Vec<char> = word.chars().collect();
            for i in 0..chars.len().saturating_sub(2) {
                let trigram = format!(
                    "{}{}{}",
                    chars[i],
                    chars[i + 1],
                    chars.get(i + 2).unwrap_or(&' ')
                );
                let trigram_hash = trigram
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));

                let dim_idx = (trigram_hash as usize) % self.dimensions;
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Also encode the whole word
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let base_dim = (word_hash as usize) % self.dimensions;
            embedding[base_dim] += *freq as f32;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramEmbedder {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }
        Ok(self.generate(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = TrigramEmbedder::new(384);
        let a = embedder.embed("disk latency spiking on node-3").await.unwrap();
        let b = embedder.embed("disk latency spiking on node-3").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_dimensions_and_normalization() {
        let embedder = TrigramEmbedder::new(256);
        let v = embedder.embed("connection pool exhausted").await.unwrap();
        assert_eq!(v.len(), 256);

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let embedder = TrigramEmbedder::new(384);
        let a = embedder.embed("kernel panic on boot").await.unwrap();
        let b = embedder.embed("certificate expired yesterday").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let embedder = TrigramEmbedder::new(384);
        assert!(embedder.embed("").await.is_err());
    }
}
