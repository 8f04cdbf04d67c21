//! DashScope generation provider.
//!
//! Integrates with Alibaba Cloud's DashScope text-generation API
//! (the service behind the qwen model family). Uses the `message`
//! result format and requires an API credential.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use opsdiag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default DashScope API base URL.
const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";

/// Text-generation endpoint path.
const GENERATION_ENDPOINT: &str = "/api/v1/services/aigc/text-generation/generation";

/// DashScope API request format.
#[derive(Debug, Serialize)]
struct DashScopeRequest {
    model: String,
    input: DashScopeInput,
    parameters: DashScopeParameters,
}

#[derive(Debug, Serialize)]
struct DashScopeInput {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct DashScopeParameters {
    result_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// DashScope API response format.
#[derive(Debug, Deserialize)]
struct DashScopeResponse {
    output: Option<DashScopeOutput>,
    #[serde(default)]
    usage: Option<DashScopeUsage>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DashScopeOutput {
    #[serde(default)]
    choices: Vec<DashScopeChoice>,
}

#[derive(Debug, Deserialize)]
struct DashScopeChoice {
    message: DashScopeMessage,
}

#[derive(Debug, Deserialize)]
struct DashScopeMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct DashScopeUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// DashScope LLM client.
pub struct DashScopeClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl DashScopeClient {
    /// Create a new DashScope client with a bounded request timeout.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Engine(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: endpoint.unwrap_or(DEFAULT_BASE_URL).to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_dashscope_request(&self, request: &LlmRequest) -> DashScopeRequest {
        DashScopeRequest {
            model: request.model.clone(),
            input: DashScopeInput {
                prompt: request.prompt.clone(),
                system: request.system.clone(),
            },
            parameters: DashScopeParameters {
                result_format: "message".to_string(),
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
            },
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for DashScopeClient {
    fn provider_name(&self) -> &str {
        "dashscope"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(model = %request.model, "Sending completion request to DashScope");

        let body = self.to_dashscope_request(request);
        let url = format!("{}{}", self.base_url, GENERATION_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Engine(format!("Failed to send request to DashScope: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Engine(format!(
                "DashScope API error ({}): {}",
                status, error_text
            )));
        }

        let ds_response: DashScopeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Engine(format!("Failed to parse DashScope response: {}", e)))?;

        if let Some(code) = ds_response.code {
            return Err(AppError::Engine(format!(
                "DashScope returned error code {}: {}",
                code,
                ds_response.message.unwrap_or_default()
            )));
        }

        // The expected output field must be present; anything else is a
        // malformed engine response, not a transport failure.
        let content = ds_response
            .output
            .and_then(|o| o.choices.into_iter().next())
            .map(|c| c.message.content)
            .ok_or_else(|| {
                AppError::ResponseFormat("DashScope response has no message content".to_string())
            })?;

        let usage = ds_response
            .usage
            .map(|u| LlmUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        tracing::info!("Received completion from DashScope");

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client =
            DashScopeClient::new("test-key", None, Duration::from_secs(60)).unwrap();
        assert_eq!(client.provider_name(), "dashscope");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_request_conversion() {
        let client =
            DashScopeClient::new("test-key", None, Duration::from_secs(60)).unwrap();
        let request = LlmRequest::new("diagnose this fault", "qwen-max")
            .with_max_tokens(1500)
            .with_temperature(0.7)
            .with_top_p(0.8);

        let ds_req = client.to_dashscope_request(&request);
        assert_eq!(ds_req.model, "qwen-max");
        assert_eq!(ds_req.input.prompt, "diagnose this fault");
        assert_eq!(ds_req.parameters.result_format, "message");
        assert_eq!(ds_req.parameters.max_tokens, Some(1500));
        assert_eq!(ds_req.parameters.top_p, Some(0.8));
    }

    #[test]
    fn test_response_content_extraction() {
        let raw = r#"{
            "output": {"choices": [{"message": {"role": "assistant", "content": "hello"}}]},
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "request_id": "abc"
        }"#;
        let parsed: DashScopeResponse = serde_json::from_str(raw).unwrap();
        let content = parsed
            .output
            .and_then(|o| o.choices.into_iter().next())
            .map(|c| c.message.content);
        assert_eq!(content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_response_missing_choices() {
        let raw = r#"{"output": {"choices": []}}"#;
        let parsed: DashScopeResponse = serde_json::from_str(raw).unwrap();
        let content = parsed
            .output
            .and_then(|o| o.choices.into_iter().next())
            .map(|c| c.message.content);
        assert!(content.is_none());
    }
}
