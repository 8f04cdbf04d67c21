//! Embedding generation for fault-knowledge retrieval.
//!
//! Provider-agnostic text-to-vector mapping. The embedding model is an
//! external service behind [`EmbeddingProvider`]; failures surface as
//! `AppError::Embedding` and are never silently replaced with zero vectors.

pub mod provider;
pub mod providers;

pub use provider::{create_embedder, EmbeddingProvider};
