//! Prompt assembly and response parsing for the diagnosis pipeline.
//!
//! Two halves of the LLM boundary:
//! - [`builder`] renders the diagnosis instruction from the alert text and
//!   retrieved reference cases.
//! - [`parser`] extracts and repairs the JSON object from raw model output.

pub mod builder;
pub mod parser;
pub mod types;

pub use builder::build_diagnosis_prompt;
pub use parser::{extract_json, validate_answer};
pub use types::{DiagnosisAnswer, PromptContext, PromptReference};
