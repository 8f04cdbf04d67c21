//! Diagnosis orchestration: retrieval-augmented fault analysis.
//!
//! Ties the other crates together: retrieval for reference cases, prompt
//! assembly, the LLM engine call, response repair, and case persistence.
//! [`rest`] exposes the pipeline over HTTP.

pub mod cases;
pub mod orchestrator;
pub mod rest;
pub mod types;

pub use cases::{CaseRecord, CaseStore};
pub use orchestrator::{DiagnosisService, MATCH_THRESHOLD, TOP_K};
pub use rest::build_router;
pub use types::{AnalyzeRequest, AnalyzeResponse, ReferenceCase};
