//! Extraction and repair of JSON objects from raw model output.
//!
//! Models wrap their JSON in markdown fences, preamble text, and literal
//! newlines inside string values. The repair pipeline here is ordered and
//! total: fences first, then brace slicing, then control-character removal,
//! then whitespace collapsing. Only after repair is the text handed to
//! serde_json.

use crate::types::DiagnosisAnswer;
use opsdiag_core::{AppError, AppResult};
use serde_json::Value;

/// Extract a JSON value from raw model output, repairing common damage.
///
/// Repair steps, in order:
/// 1. Strip markdown code fences (```json and ```).
/// 2. Slice from the first `{` to the last `}`; fail if no such pair exists.
/// 3. Drop every character below codepoint 32 (raw newlines inside string
///    values are invalid JSON).
/// 4. Collapse whitespace runs to single spaces and trim.
pub fn extract_json(raw: &str) -> AppResult<Value> {
    let without_fences = raw.replace("```json", "").replace("```", "");

    let start = without_fences.find('{');
    let end = without_fences.rfind('}');
    let sliced = match (start, end) {
        (Some(start), Some(end)) if end > start => &without_fences[start..=end],
        _ => {
            tracing::error!("Could not find JSON object in response: {}", raw);
            return Err(AppError::Parse("no JSON object found in response".to_string()));
        }
    };

    let cleaned: String = sliced.chars().filter(|c| (*c as u32) >= 32).collect();

    let collapsed = collapse_whitespace(&cleaned);
    let cleaned = collapsed.trim();

    serde_json::from_str(cleaned).map_err(|e| {
        tracing::error!("JSON parsing failed: {} (content: {})", e, cleaned);
        AppError::Parse(format!("invalid JSON after repair: {}: {}", e, cleaned))
    })
}

/// Validate that a parsed value carries the required diagnosis fields.
///
/// Missing fields are all named in the error so a single retry can fix the
/// complete shape.
pub fn validate_answer(value: &Value) -> AppResult<DiagnosisAnswer> {
    const REQUIRED: [&str; 3] = ["category", "analysis", "solution"];

    let missing: Vec<&str> = REQUIRED
        .iter()
        .filter(|field| value.get(**field).and_then(Value::as_str).is_none())
        .copied()
        .collect();

    if !missing.is_empty() {
        return Err(AppError::ResponseFormat(format!(
            "diagnosis response missing required fields: {}",
            missing.join(", ")
        )));
    }

    serde_json::from_value(value.clone())
        .map_err(|e| AppError::ResponseFormat(format!("malformed diagnosis response: {}", e)))
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
