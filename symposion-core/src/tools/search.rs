//! Web search client and the `google_search` tool

use async_trait::async_trait;
use serde::Deserialize;

use super::tool::{Tool, ToolContext, ToolId, ToolMetadata, ToolParameter};
use crate::config::SearchConfig;
use crate::error::{Result, SymposionError};

/// Issues a single search request and returns the raw response body.
///
/// No retry and no caching; callers decide what to do with failures.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SearchClient {
    /// # Errors
    ///
    /// Fails if the API key is missing or the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            SymposionError::Configuration("search API key is not set (SERPER_API_KEY)".to_string())
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
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one search.
    ///
    /// # Errors
    ///
    /// `Network` on transport failure, `Auth` on 401/403, `Provider` on any
    /// other non-2xx status.
    pub async fn search(&self, query: &str) -> Result<String> {
        tracing::info!(tool = "google_search", query = %query, "Searching");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await
            .map_err(|e| SymposionError::network(&self.endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SymposionError::network(&self.endpoint, e))?;

        if status.is_success() {
            return Ok(body);
        }

        tracing::warn!(tool = "google_search", status = status.as_u16(), "Search request failed");
        match status.as_u16() {
            401 | 403 => Err(SymposionError::Auth {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            }),
            code => Err(SymposionError::Provider { status: code, body }),
        }
    }
}

/// Arguments of `google_search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    #[serde(alias = "search_keyword")]
    pub query: String,
}

#[async_trait]
impl Tool for SearchClient {
    type Args = SearchArgs;

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            ToolId::GoogleSearch,
            "Search the web and return the raw JSON results (titles, links, snippets)",
        )
        .with_parameter(ToolParameter::required("query", "Search keywords"))
        .with_returns("Raw search results as JSON text")
    }

    async fn call(&self, args: SearchArgs, _ctx: &ToolContext) -> Result<String> {
        if args.query.trim().is_empty() {
            return Err(SymposionError::Validation("query must not be empty".to_string()));
        }
        self.search(&args.query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_requires_api_key() {
        let config = SearchConfig::default();
        assert!(matches!(
            SearchClient::new(&config),
            Err(SymposionError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let config = SearchConfig {
            endpoint: "http://127.0.0.1:9/search".to_string(),
            api_key: Some("k".to_string()),
            timeout: Duration::from_secs(2),
        };
        let client = SearchClient::new(&config).unwrap();
        let err = client.search("rust").await.unwrap_err();
        assert!(matches!(err, SymposionError::Network { .. }));
        assert!(err.is_transient());
    }
}
