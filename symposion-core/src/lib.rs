//! # Symposion - a research crew in a group chat
//!
//! Symposion runs a bounded multi-agent conversation that researches a brand
//! or business question:
//! - A user proxy opens the chat with the brief and interjects when invited
//! - A researcher searches the web and scrapes pages through typed tools
//! - A research manager reviews the findings, a director writes the answer
//! - Long pages are condensed by chunked map-reduce summarization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symposion_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SymposionConfig::load()?;
//!     let session = ResearchSession::builder(config).build()?;
//!
//!     let outcome = session
//!         .run("Acme", "Compare Acme's pricing with its two closest competitors")
//!         .await?;
//!     println!("{}", outcome.history.render_transcript());
//!     println!("finished after {} rounds: {}", outcome.rounds, outcome.reason);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **tools**: search and render clients behind a closed, typed tool registry
//! - **summarize**: recursive splitter plus map-reduce summarizer
//! - **agent**: LLM-backed participants and the user proxy
//! - **orchestrator**: turn-taking state machine with termination rules
//! - **session**: builds all of the above from [`config::SymposionConfig`]
//!
//! ## Feature Flags
//!
//! - `llm-openai` (default): OpenAI-compatible chat-completions provider

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod session;
pub mod summarize;
pub mod tools;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{
        Agent, AgentReply, AgentRole, HumanInput, HumanInputMode, LlmAgent, TERMINATE,
        TerminationConfig, TerminationPolicy, UserProxyAgent,
    };
    pub use crate::config::{
        AgentConfig, ChatConfig, LLMProvider as LLMProviderType, LLMProviderConfig,
        RenderConfig, SearchConfig, SummarizerConfig, SymposionConfig,
    };
    pub use crate::conversation::{ChatMessage, ConversationHistory, MessageKind};
    pub use crate::error::{Result, SymposionError};
    pub use crate::llm::{
        LLMConfig, LLMProvider, LLMProviderFactory, LLMRequest, LLMResponse, Message, MessageRole,
        RetryBudget, RetryConfig,
    };
    pub use crate::orchestrator::{ChatLimits, ChatOrchestrator, ChatOutcome, TerminationReason};
    pub use crate::session::{ResearchSession, SessionBuilder, compose_opening};
    pub use crate::summarize::{MapReduceSummarizer, RecursiveSplitter, Summarize};
    pub use crate::tools::{
        ContentTool, PageFetch, PageFetcher, SearchClient, Tool, ToolCall, ToolContext, ToolError,
        ToolErrorKind, ToolId, ToolRegistry, ToolResult,
    };
}
