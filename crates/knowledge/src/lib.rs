//! Fault-knowledge retrieval for opsdiag.
//!
//! This crate owns the retrieval half of the diagnosis pipeline:
//! - The knowledge store (SQLite system of record for fault knowledge)
//! - Embedding providers (Ollama, deterministic trigram fallback)
//! - The persistent vector index (LanceDB) and its search contract
//! - The retrieval service that turns query text into ranked matches
//! - The batch sync job that rebuilds the index from the store
//!
//! Index consistency is resync-driven: mutations to the knowledge store are
//! mirrored into the index by callers or by the next full sync, so stale
//! matches may surface between a store mutation and the next sync run.

pub mod embeddings;
pub mod lancedb_index;
pub mod retrieval;
pub mod store;
pub mod sync;
pub mod types;
pub mod vector_index;

pub use embeddings::{create_embedder, EmbeddingProvider};
pub use lancedb_index::LanceDbIndex;
pub use retrieval::RetrievalService;
pub use store::{KnowledgeStore, SqliteKnowledgeStore};
pub use sync::{sync_all, SyncOutcome, SyncReport};
pub use types::{IndexedRecord, KnowledgeEntry, RankedMatch, SearchHit};
pub use vector_index::VectorIndex;
