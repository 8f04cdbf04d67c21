//! Generation engine integration for opsdiag.
//!
//! Provides a provider-agnostic client abstraction over the external LLM
//! used to produce diagnosis answers, plus concrete providers (DashScope,
//! Ollama) and a factory for constructing them from configuration.

pub mod client;
pub mod factory;
pub mod providers;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
