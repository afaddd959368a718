use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a single generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Temperature for generation (0.0-2.0, default: 0.7)
    pub temperature: f32,

    /// Maximum tokens to generate (default: 500)
    pub max_tokens: usize,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

impl LLMConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Message role in a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
}

impl LLMRequest {
    /// Create a simple request from a single prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::from_messages(vec![Message::user(prompt)])
    }

    /// Create a request from a full message list
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated content
    pub content: String,

    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// The opaque generation capability used by agents and the summarizer.
///
/// Implementors only need `generate_request`; `generate` wraps a single
/// prompt into a request.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate text for a single prompt.
    async fn generate(&self, prompt: &str, config: &LLMConfig) -> Result<String> {
        let request = LLMRequest::from_prompt(prompt)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);

        let response = self.generate_request(&request).await?;
        Ok(response.content)
    }

    /// Generate a reply for a structured request.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

pub mod factory;
pub mod providers;
pub mod retry;

pub use retry::{RetryBudget, RetryConfig, RetryState, with_retry, with_retry_if};

pub use factory::LLMProviderFactory;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingProvider {
        seen: Mutex<Vec<LLMRequest>>,
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(LLMResponse {
                content: "ok".to_string(),
                usage: None,
            })
        }
    }

    #[test]
    fn test_llm_config() {
        let config = LLMConfig::new()
            .with_temperature(1.5)
            .with_max_tokens(1000);

        assert_eq!(config.temperature, 1.5);
        assert_eq!(config.max_tokens, 1000);
    }

    #[test]
    fn test_temperature_clamping() {
        let config = LLMConfig::new().with_temperature(5.0);
        assert_eq!(config.temperature, 2.0);

        let config = LLMConfig::new().with_temperature(-1.0);
        assert_eq!(config.temperature, 0.0);
    }

    #[tokio::test]
    async fn test_generate_wraps_prompt() {
        let provider = RecordingProvider {
            seen: Mutex::new(Vec::new()),
        };
        let config = LLMConfig::new().with_temperature(0.0).with_max_tokens(64);

        let out = provider.generate("Summarize this", &config).await.unwrap();
        assert_eq!(out, "ok");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].messages[0].role, MessageRole::User);
        assert_eq!(seen[0].messages[0].content, "Summarize this");
        assert_eq!(seen[0].temperature, Some(0.0));
        assert_eq!(seen[0].max_tokens, Some(64));
    }
}
