//! Tool-calling layer
//!
//! This module holds everything an agent can reach outside the conversation:
//! - [`SearchClient`]: one search request, raw results back
//! - [`PageFetcher`]: one render request, raw HTML back
//! - [`ContentTool`]: fetch, strip markup, summarize when long
//! - [`ToolRegistry`]: typed dispatch with timeout and cancellation
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo(search: symposion_core::tools::SearchClient) {
//! use symposion_core::tools::{ToolCall, ToolContext, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(search).unwrap();
//!
//! let call = ToolCall::new("google_search").with_arg("query", "rust async runtimes");
//! let result = registry.dispatch(&call, &ToolContext::new()).await;
//! println!("{}", result.content);
//! # }
//! ```

mod content;
mod fetch;
mod registry;
mod result;
mod search;
mod tool;

pub use content::{ContentTool, ScrapeArgs, strip_markup};
pub use fetch::{PageFetch, PageFetcher};
pub use registry::{DispatchConfig, RegistryError, ToolRegistry};
pub use result::{ToolError, ToolErrorKind, ToolProvenance, ToolResult};
pub use search::{SearchArgs, SearchClient};
pub use tool::{
    Tool, ToolArguments, ToolCall, ToolContext, ToolId, ToolMetadata, ToolParameter, decode_args,
};

#[cfg(test)]
mod tests;
