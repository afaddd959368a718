//! OpenAI chat-completions provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SymposionError};
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, Message, MessageRole, ModelInfo, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI LLM provider (or any chat-completions compatible API).
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (e.g., "gpt-4o", "gpt-3.5-turbo-16k")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create with a custom base URL (for Azure OpenAI or compatible APIs).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SymposionError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(self)
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessageResponse>,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

fn convert_messages(messages: &[Message]) -> Vec<OpenAIMessage> {
    messages
        .iter()
        .map(|m| OpenAIMessage {
            role: match m.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: m.content.clone(),
        })
        .collect()
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let openai_request = OpenAIRequest {
            model: self.model.clone(),
            messages: convert_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| SymposionError::network(&url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            // Try to parse as OpenAI error format
            let message = match serde_json::from_str::<OpenAIError>(&text) {
                Ok(error) => match error.error.error_type {
                    Some(kind) => format!("{} ({})", error.error.message, kind),
                    None => error.error.message,
                },
                Err(_) => text,
            };
            tracing::warn!(status = status.as_u16(), "Generation request failed");
            return Err(SymposionError::LlmApi {
                status: status.as_u16(),
                message,
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| SymposionError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let Some(choice) = openai_response.choices.first() else {
            return Err(SymposionError::Llm(
                "OpenAI API returned no choices".to_string(),
            ));
        };

        let content = choice
            .message
            .as_ref()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        let usage = openai_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LLMResponse { content, usage })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key", "gpt-4o");
        assert_eq!(provider.model(), "gpt-4o");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_openai_provider_custom_base_url() {
        let provider =
            OpenAIProvider::with_base_url("test-key", "gpt-4", "https://custom.openai.azure.com/");
        assert_eq!(provider.model(), "gpt-4");
        assert_eq!(provider.base_url(), "https://custom.openai.azure.com");
    }

    #[test]
    fn test_convert_messages() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
        ];

        let converted = convert_messages(&messages);

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[2].role, "assistant");
    }

    #[test]
    fn test_model_info() {
        let provider = OpenAIProvider::new("test-key", "gpt-4o-mini");
        let info = provider.model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let provider = OpenAIProvider::with_base_url("k", "m", "http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(2))
            .unwrap();
        let err = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, SymposionError::Network { .. }));
        assert!(err.is_transient());
    }
}
