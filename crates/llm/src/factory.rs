//! Generation engine factory.
//!
//! Creates LLM clients from configuration: provider resolution, credential
//! injection, and timeout wiring happen here, once, at startup.

use crate::client::LlmClient;
use crate::providers::{DashScopeClient, OllamaClient};
use opsdiag_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("dashscope", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API credential (required for DashScope)
/// * `timeout` - Bounded timeout applied to every engine call
///
/// # Errors
/// Returns `AppError::Config` when the provider is unknown or a required
/// credential is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "dashscope" => {
            let key = api_key.ok_or_else(|| {
                AppError::Config("DashScope provider requires an API key".to_string())
            })?;
            let client = DashScopeClient::new(key, endpoint, timeout)?;
            Ok(Arc::new(client))
        }
        "ollama" => {
            let client = OllamaClient::new(endpoint, timeout)?;
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}
