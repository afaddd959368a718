//! Dispatch tests for the tools module

use super::*;
use crate::error::{Result, SymposionError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
struct QueryArgs {
    #[serde(alias = "search_keyword")]
    query: String,
}

/// Stands in for the search tool; echoes the query
#[derive(Default)]
struct EchoSearch {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for EchoSearch {
    type Args = QueryArgs;

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(ToolId::GoogleSearch, "Echo search")
            .with_parameter(ToolParameter::required("query", "keywords"))
    }

    async fn call(&self, args: QueryArgs, _ctx: &ToolContext) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{{\"organic\":[{{\"title\":\"{}\"}}]}}", args.query))
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeLike {
    #[allow(dead_code)]
    objective: String,
    url: String,
}

/// Stands in for the scraping tool; sleeps or fails on demand
struct SlowScrape {
    delay: Duration,
    fail_with: Option<u16>,
}

#[async_trait]
impl Tool for SlowScrape {
    type Args = ScrapeLike;

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(ToolId::WebScraping, "Slow scrape")
            .with_parameter(ToolParameter::required("objective", "why"))
            .with_parameter(ToolParameter::required("url", "where"))
    }

    async fn call(&self, args: ScrapeLike, _ctx: &ToolContext) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        match self.fail_with {
            Some(status) => Err(SymposionError::Auth {
                endpoint: "render".to_string(),
                status,
                body: "denied".to_string(),
            }),
            None => Ok(format!("text of {}", args.url)),
        }
    }
}

fn registry_with(delay: Duration, fail_with: Option<u16>) -> ToolRegistry {
    let mut registry = ToolRegistry::with_config(
        DispatchConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_tool_timeout(ToolId::WebScraping, Duration::from_millis(50)),
    );
    registry.register(EchoSearch::default()).unwrap();
    registry
        .register(SlowScrape { delay, fail_with })
        .unwrap();
    registry
}

#[test]
fn test_duplicate_registration_fails() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoSearch::default()).unwrap();
    let err = registry.register(EchoSearch::default()).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateTool(ToolId::GoogleSearch));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_dispatch_success_passes_content_through() {
    let registry = registry_with(Duration::ZERO, None);
    let call = ToolCall::new("google_search").with_arg("query", "acme pricing");
    let ctx = ToolContext::new().with_agent_id("researcher").with_trace_id("t-1");

    let result = registry.dispatch(&call, &ctx).await;

    assert!(result.ok);
    assert_eq!(result.content, "{\"organic\":[{\"title\":\"acme pricing\"}]}");
    assert_eq!(result.provenance.tool_name, "google_search");
    assert_eq!(result.provenance.agent_id.as_deref(), Some("researcher"));
    assert_eq!(result.provenance.args_hash.len(), 16);
}

#[tokio::test]
async fn test_legacy_argument_name_accepted() {
    let registry = registry_with(Duration::ZERO, None);
    let call = ToolCall::new("google_search").with_arg("search_keyword", "acme");
    assert!(registry.dispatch(&call, &ToolContext::new()).await.ok);
}

#[tokio::test]
async fn test_unknown_tool_is_failed_result() {
    let registry = registry_with(Duration::ZERO, None);
    let call = ToolCall::new("send_email").with_arg("to", "x");

    let result = registry.dispatch(&call, &ToolContext::new()).await;

    assert!(!result.ok);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::UnknownToolError));
    assert!(result.content.starts_with("[UnknownToolError]"));
}

#[tokio::test]
async fn test_known_but_unregistered_tool_is_unknown() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoSearch::default()).unwrap();
    let call = ToolCall::new("web_scraping")
        .with_arg("objective", "o")
        .with_arg("url", "u");

    let result = registry.dispatch(&call, &ToolContext::new()).await;
    assert_eq!(result.error_kind(), Some(ToolErrorKind::UnknownToolError));
}

#[tokio::test]
async fn test_missing_argument_is_validation_error() {
    let search = EchoSearch::default();
    let calls = search.calls.clone();
    let mut registry = ToolRegistry::new();
    registry.register(search).unwrap();

    let call = ToolCall::new("google_search").with_arg("q", "wrong name");
    let result = registry.dispatch(&call, &ToolContext::new()).await;

    assert!(!result.ok);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::ValidationError));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_error_keeps_kind_and_status() {
    let registry = registry_with(Duration::ZERO, Some(403));
    let call = ToolCall::new("web_scraping")
        .with_arg("objective", "pricing")
        .with_arg("url", "https://example.com");

    let result = registry.dispatch(&call, &ToolContext::new()).await;

    assert!(!result.ok);
    assert_eq!(result.error_kind(), Some(ToolErrorKind::AuthError));
    assert_eq!(result.error.as_ref().and_then(|e| e.status), Some(403));
}

#[tokio::test]
async fn test_per_tool_timeout() {
    let registry = registry_with(Duration::from_secs(2), None);
    let call = ToolCall::new("web_scraping")
        .with_arg("objective", "pricing")
        .with_arg("url", "https://example.com");

    let result = registry.dispatch(&call, &ToolContext::new()).await;

    assert_eq!(result.error_kind(), Some(ToolErrorKind::Timeout));
    assert!(result.is_retryable());
}

#[tokio::test]
async fn test_cancellation_during_execution() {
    let mut registry = ToolRegistry::with_config(DispatchConfig::default());
    registry
        .register(SlowScrape {
            delay: Duration::from_secs(5),
            fail_with: None,
        })
        .unwrap();
    let token = CancellationToken::new();
    let ctx = ToolContext::new().with_cancellation(token.clone());
    let call = ToolCall::new("web_scraping")
        .with_arg("objective", "pricing")
        .with_arg("url", "https://example.com");

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let result = registry.dispatch(&call, &ctx).await;
    canceller.await.unwrap();

    assert_eq!(result.error_kind(), Some(ToolErrorKind::Cancelled));
}

#[tokio::test]
async fn test_cancelled_before_dispatch() {
    let search = EchoSearch::default();
    let calls = search.calls.clone();
    let mut registry = ToolRegistry::new();
    registry.register(search).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = ToolContext::new().with_cancellation(token);
    let result = registry
        .dispatch(&ToolCall::new("google_search").with_arg("query", "x"), &ctx)
        .await;

    assert_eq!(result.error_kind(), Some(ToolErrorKind::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_describe_lists_tools_and_arguments() {
    let registry = registry_with(Duration::ZERO, None);
    let catalogue = registry.describe();

    assert!(catalogue.contains("- google_search: Echo search"));
    assert!(catalogue.contains("query (required): keywords"));
    assert!(catalogue.contains("- web_scraping: Slow scrape"));

    let only_search = registry.describe_for(&[ToolId::GoogleSearch]);
    assert!(!only_search.contains("web_scraping"));
}

#[test]
fn test_same_arguments_hash_identically() {
    let a = ToolCall::new("google_search")
        .with_arg("query", "x")
        .with_arg("page", "1");
    let b = ToolCall::new("google_search")
        .with_arg("page", "1")
        .with_arg("query", "x");
    let registry = ToolRegistry::new();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let ha = rt.block_on(registry.dispatch(&a, &ToolContext::new()));
    let hb = rt.block_on(registry.dispatch(&b, &ToolContext::new()));
    assert_eq!(ha.provenance.args_hash, hb.provenance.args_hash);
}
