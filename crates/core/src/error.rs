//! Error types for the opsdiag service.
//!
//! This module defines a unified error enum covering every failure category
//! in the diagnosis pipeline: caller input, the upstream generation engine,
//! response parsing, embedding, the vector index, and the record stores.

use thiserror::Error;

/// Unified error type for the opsdiag service.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
///
/// The variants also encode the HTTP mapping used by the REST surface:
/// `Validation` is a caller error (400), everything else is a server-side
/// failure (500).
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad caller input (empty alert text, malformed request body)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The generation engine was unreachable or returned a non-success status
    #[error("Generation engine error: {0}")]
    Engine(String),

    /// The engine answered, but the output is missing expected fields
    #[error("Response format error: {0}")]
    ResponseFormat(String),

    /// JSON could not be extracted or parsed from the engine's output text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Embedding model call failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index operation failed
    #[error("Index error: {0}")]
    Index(String),

    /// Knowledge or case store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors outside the LLM parse path
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unexpected errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure is attributable to the caller.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
