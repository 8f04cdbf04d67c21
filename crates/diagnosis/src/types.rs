//! Request and response types for the analyze operation.

use serde::{Deserialize, Serialize};

/// Incoming analyze request.
///
/// Only the alert text is required; metrics and log excerpts default to
/// empty and are simply omitted from the prompt when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub alert_info: String,
    #[serde(default)]
    pub metrics_info: String,
    #[serde(default)]
    pub log_info: String,
}

/// A knowledge entry surfaced to the caller as supporting evidence.
///
/// `similarity` is a display string like `"87.31%"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceCase {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub symptoms: String,
    pub solution: String,
    pub similarity: String,
}

/// Result of a completed diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Persisted case id
    pub id: i64,
    pub category: String,
    pub analysis: String,
    pub solution: String,
    /// Best knowledge match above the similarity threshold, if any
    pub matched_knowledge_id: Option<i64>,
    pub reference_cases: Vec<ReferenceCase>,
}
