//! Generation engine provider implementations.

pub mod dashscope;
pub mod ollama;

pub use dashscope::DashScopeClient;
pub use ollama::OllamaClient;
