//! Prompt system type definitions.

use serde::{Deserialize, Serialize};

/// A reference case rendered into the prompt.
///
/// `score` is pre-formatted to two decimals so the template stays dumb.
#[derive(Debug, Clone, Serialize)]
pub struct PromptReference {
    pub title: String,
    pub category: String,
    pub symptoms: String,
    pub solution: String,
    pub score: String,
}

/// Ephemeral input to the prompt builder; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub alert_info: String,
    pub metrics_info: String,
    pub log_info: String,
    pub references: Vec<PromptReference>,
}

impl PromptContext {
    /// Build a context from the request fields and retrieved matches.
    pub fn new(
        alert_info: impl Into<String>,
        metrics_info: impl Into<String>,
        log_info: impl Into<String>,
        references: Vec<PromptReference>,
    ) -> Self {
        Self {
            alert_info: alert_info.into(),
            metrics_info: metrics_info.into(),
            log_info: log_info.into(),
            references,
        }
    }
}

/// The required fields of a parsed diagnosis answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisAnswer {
    pub category: String,
    pub analysis: String,
    pub solution: String,
}
