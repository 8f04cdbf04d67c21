//! Prompt builder for the diagnosis instruction.
//!
//! Renders the fixed diagnosis template with Handlebars. Optional sections
//! (metrics, logs, reference cases) only appear when the corresponding
//! context field is non-empty, so the model never sees empty headings.

use crate::types::PromptContext;
use handlebars::Handlebars;
use opsdiag_core::{AppError, AppResult};

/// The diagnosis instruction template.
///
/// The model is asked for a JSON object with exactly the fields the parser
/// validates: `category`, `analysis`, `solution`.
const DIAGNOSIS_TEMPLATE: &str = r#"As a fault diagnosis expert, analyze the following fault information and provide a diagnosis.
Return the result as JSON with the following fields:
- category: the fault category (choose the most fitting classification for the symptoms)
- analysis: your analysis of the root cause
- solution: the recommended resolution steps

Fault information:
Alert: {{alert_info}}
{{#if metrics_info}}Metrics: {{metrics_info}}
{{/if}}{{#if log_info}}Logs: {{log_info}}
{{/if}}{{#if references}}
Reference cases from the knowledge base:
{{#each references}}
Title: {{title}}
Category: {{category}}
Symptoms: {{symptoms}}
Solution: {{solution}}
Similarity: {{score}}
---
{{/each}}
{{/if}}
Based on the information above, especially the reference cases, give an accurate diagnosis. Make sure the response is valid JSON."#;

/// Render the diagnosis prompt from the request context.
pub fn build_diagnosis_prompt(context: &PromptContext) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("diagnosis", DIAGNOSIS_TEMPLATE)
        .map_err(|e| AppError::Internal(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("diagnosis", context)
        .map_err(|e| AppError::Internal(format!("Failed to render prompt: {}", e)))?;

    tracing::debug!("Built diagnosis prompt ({} chars)", rendered.len());

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptReference;

    fn reference(title: &str, score: &str) -> PromptReference {
        PromptReference {
            title: title.to_string(),
            category: "network".to_string(),
            symptoms: "resolution timeouts".to_string(),
            solution: "restart resolver".to_string(),
            score: score.to_string(),
        }
    }

    #[test]
    fn test_minimal_prompt_omits_optional_sections() {
        let context = PromptContext::new("CPU above 95%", "", "", Vec::new());
        let prompt = build_diagnosis_prompt(&context).unwrap();

        assert!(prompt.contains("Alert: CPU above 95%"));
        assert!(!prompt.contains("Metrics:"));
        assert!(!prompt.contains("Logs:"));
        assert!(!prompt.contains("Reference cases"));
    }

    #[test]
    fn test_full_prompt_includes_all_sections() {
        let context = PromptContext::new(
            "CPU above 95%",
            "load average 40",
            "oom-killer invoked",
            vec![reference("Runaway batch job", "87.31")],
        );
        let prompt = build_diagnosis_prompt(&context).unwrap();

        assert!(prompt.contains("Metrics: load average 40"));
        assert!(prompt.contains("Logs: oom-killer invoked"));
        assert!(prompt.contains("Title: Runaway batch job"));
        assert!(prompt.contains("Similarity: 87.31"));
    }

    #[test]
    fn test_references_render_in_given_order() {
        let context = PromptContext::new(
            "disk alerts firing",
            "",
            "",
            vec![reference("First", "90.00"), reference("Second", "50.00")],
        );
        let prompt = build_diagnosis_prompt(&context).unwrap();

        let first = prompt.find("Title: First").unwrap();
        let second = prompt.find("Title: Second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_alert_text_is_not_escaped() {
        let context = PromptContext::new("latency > 500ms & rising", "", "", Vec::new());
        let prompt = build_diagnosis_prompt(&context).unwrap();
        assert!(prompt.contains("latency > 500ms & rising"));
    }
}
