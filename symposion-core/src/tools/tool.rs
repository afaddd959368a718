//! Tool trait, identifiers and call types
//!
//! Tools are the only way agents reach the outside world. The set of tools is
//! closed ([`ToolId`]); each tool declares a typed argument struct that the
//! registry decodes from the string map an agent supplies.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

use super::result::ToolError;
use crate::error::{Result, SymposionError};

/// Argument map as supplied by an agent
pub type ToolArguments = BTreeMap<String, String>;

/// Identifier of every tool the system knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    /// Web search through the search endpoint
    GoogleSearch,
    /// Page fetch with conditional summarization
    WebScraping,
}

impl ToolId {
    pub const ALL: [ToolId; 2] = [ToolId::GoogleSearch, ToolId::WebScraping];

    /// Name agents use to call the tool
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::GoogleSearch => "google_search",
            ToolId::WebScraping => "web_scraping",
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = SymposionError;

    fn from_str(s: &str) -> Result<Self> {
        ToolId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| SymposionError::UnknownTool(s.to_string()))
    }
}

/// A tool invocation requested by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Requested tool name (validated at dispatch)
    pub tool_name: String,

    /// Raw string arguments
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: ToolArguments::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Canonical JSON rendering, as appended to the transcript
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "tool": self.tool_name,
            "arguments": self.arguments,
        })
        .to_string()
    }
}

/// One declared argument of a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool metadata for LLM-facing descriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Tool identifier
    pub id: ToolId,

    /// Human-readable description
    pub description: String,

    /// Declared arguments
    pub parameters: Vec<ToolParameter>,

    /// What the tool returns
    pub returns: String,
}

impl ToolMetadata {
    pub fn new(id: ToolId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            parameters: Vec::new(),
            returns: "Tool-specific text".to_string(),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = returns.into();
        self
    }

    /// JSON Schema object describing the arguments
    pub fn schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({ "type": "string", "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Context provided to every dispatch
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Agent making the call
    pub agent_id: Option<String>,

    /// Trace id for correlation
    pub trace_id: Option<String>,

    /// Cancellation token of the owning session
    pub cancellation: Option<CancellationToken>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Core tool trait
///
/// `Args` is decoded from the agent's string map before `call` runs, so a
/// handler never sees malformed input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Typed arguments
    type Args: DeserializeOwned + Send + 'static;

    /// Get tool metadata
    fn metadata(&self) -> ToolMetadata;

    /// Run the tool
    async fn call(&self, args: Self::Args, ctx: &ToolContext) -> Result<String>;
}

/// Object-safe view of a [`Tool`] used by the registry
pub(crate) trait ErasedTool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Decode arguments, then hand back the pending call
    fn prepare<'a>(
        &'a self,
        args: &ToolArguments,
        ctx: &'a ToolContext,
    ) -> std::result::Result<BoxFuture<'a, Result<String>>, ToolError>;
}

impl<T> ErasedTool for T
where
    T: Tool + 'static,
{
    fn metadata(&self) -> ToolMetadata {
        Tool::metadata(self)
    }

    fn prepare<'a>(
        &'a self,
        args: &ToolArguments,
        ctx: &'a ToolContext,
    ) -> std::result::Result<BoxFuture<'a, Result<String>>, ToolError> {
        let typed = decode_args::<T::Args>(args)?;
        Ok(self.call(typed, ctx))
    }
}

/// Decode a string map into a typed argument struct
pub fn decode_args<A: DeserializeOwned>(args: &ToolArguments) -> std::result::Result<A, ToolError> {
    let object: serde_json::Map<String, serde_json::Value> = args
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| ToolError::validation(format!("invalid arguments: {}", e)))
}

#[cfg(test)]
mod tool_tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct PairArgs {
        left: String,
        #[serde(alias = "other")]
        right: String,
    }

    #[test]
    fn test_tool_id_names() {
        assert_eq!(ToolId::GoogleSearch.as_str(), "google_search");
        assert_eq!("web_scraping".parse::<ToolId>().unwrap(), ToolId::WebScraping);
        assert!(matches!(
            "browse".parse::<ToolId>(),
            Err(SymposionError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_tool_id_serde_matches_name() {
        let json = serde_json::to_string(&ToolId::WebScraping).unwrap();
        assert_eq!(json, "\"web_scraping\"");
    }

    #[test]
    fn test_decode_args_with_alias() {
        let call = ToolCall::new("pair")
            .with_arg("left", "a")
            .with_arg("other", "b");
        let args: PairArgs = decode_args(&call.arguments).unwrap();
        assert_eq!(args.left, "a");
        assert_eq!(args.right, "b");
    }

    #[test]
    fn test_decode_args_missing_field() {
        let call = ToolCall::new("pair").with_arg("left", "a");
        let err = decode_args::<PairArgs>(&call.arguments).unwrap_err();
        assert_eq!(err.kind, crate::tools::ToolErrorKind::ValidationError);
        assert!(err.message.contains("right"));
    }

    #[test]
    fn test_schema_lists_required() {
        let metadata = ToolMetadata::new(ToolId::WebScraping, "Scrape")
            .with_parameter(ToolParameter::required("objective", "why"))
            .with_parameter(ToolParameter::required("url", "where"));
        let schema = metadata.schema();
        assert_eq!(schema["required"], serde_json::json!(["objective", "url"]));
        assert_eq!(schema["properties"]["url"]["type"], "string");
    }

    #[test]
    fn test_tool_call_json() {
        let call = ToolCall::new("google_search").with_arg("query", "rust");
        let value: serde_json::Value = serde_json::from_str(&call.to_json()).unwrap();
        assert_eq!(value["tool"], "google_search");
        assert_eq!(value["arguments"]["query"], "rust");
    }
}
