//! Embedding provider implementations.

pub mod ollama;
pub mod trigram;
