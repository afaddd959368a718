//! Headless-browser page fetcher

use async_trait::async_trait;

use crate::config::RenderConfig;
use crate::error::{Result, SymposionError};

/// Anything that can turn a URL into raw HTML
#[async_trait]
pub trait PageFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Issues a single render request for a URL and returns the raw HTML
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl PageFetcher {
    /// # Errors
    ///
    /// Fails if the token is missing or the HTTP client cannot be built.
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let token = config.api_key.clone().ok_or_else(|| {
            SymposionError::Configuration(
                "render token is not set (BROWSERLESS_API_KEY)".to_string(),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                SymposionError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PageFetch for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if url.trim().is_empty() {
            return Err(SymposionError::Validation("url must not be empty".to_string()));
        }

        tracing::info!(tool = "web_scraping", url = %url, "Scraping website");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("token", self.token.as_str())])
            .header("Cache-Control", "no-cache")
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| SymposionError::network(&self.endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SymposionError::network(&self.endpoint, e))?;

        match status {
            200 => Ok(body),
            401 | 403 => {
                tracing::warn!(tool = "web_scraping", status, "Render request rejected");
                Err(SymposionError::Auth {
                    endpoint: self.endpoint.clone(),
                    status,
                    body,
                })
            }
            _ => {
                tracing::warn!(tool = "web_scraping", status, "HTTP request failed");
                Err(SymposionError::Render { status, body })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(&RenderConfig {
            endpoint: "http://127.0.0.1:9/content".to_string(),
            api_key: Some("token".to_string()),
            timeout: std::time::Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_blank_url_rejected_before_request() {
        let err = fetcher().fetch("   ").await.unwrap_err();
        assert!(matches!(err, SymposionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let err = fetcher().fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, SymposionError::Network { .. }));
    }

    #[test]
    fn test_requires_token() {
        assert!(PageFetcher::new(&RenderConfig::default()).is_err());
    }
}
