//! Factory for creating LLM providers from configuration

use crate::config::{LLMProvider as LLMProviderType, LLMProviderConfig};
use crate::error::{Result, SymposionError};
use crate::llm::LLMProvider;
use std::sync::Arc;

#[cfg(feature = "llm-openai")]
use crate::llm::providers::openai::OpenAIProvider;

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing API key)
    pub fn create(config: &LLMProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        match config.provider {
            #[cfg(feature = "llm-openai")]
            LLMProviderType::OpenAI => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    SymposionError::Configuration(
                        "OpenAI provider requires an API key (OPENAI_API_KEY)".to_string(),
                    )
                })?;

                let provider = match &config.base_url {
                    Some(base_url) => {
                        OpenAIProvider::with_base_url(api_key, config.model.clone(), base_url.clone())
                    }
                    None => OpenAIProvider::new(api_key, config.model.clone()),
                }
                .with_timeout(config.timeout)?;

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-openai"))]
            LLMProviderType::OpenAI => Err(SymposionError::Configuration(
                "OpenAI provider requires 'llm-openai' feature".to_string(),
            )),
        }
    }
}

#[cfg(all(test, feature = "llm-openai"))]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_key() {
        let config = LLMProviderConfig::default();
        assert!(LLMProviderFactory::create(&config).is_err());
    }

    #[test]
    fn test_create_openai() {
        let config = LLMProviderConfig {
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        };
        let provider = LLMProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model_info().model_name, "gpt-4o-mini");
    }
}
