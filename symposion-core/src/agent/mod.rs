//! Chat participants
//!
//! Every participant implements [`Agent`]: given the shared history it
//! produces one reply, which may ask for a tool run. Two implementations ship
//! with the crate: [`LlmAgent`] for the researcher, research manager and
//! director, and [`UserProxyAgent`] standing in for the human.

mod llm_agent;
mod parse;
mod termination;
mod user_proxy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::{ChatMessage, ConversationHistory};
use crate::error::Result;
use crate::tools::ToolCall;

pub use llm_agent::LlmAgent;
pub use parse::parse_tool_call;
pub use termination::{
    ContainsKeyword, ExactKeyword, NeverTerminate, TERMINATE, TerminationConfig,
    TerminationPolicy,
};
pub use user_proxy::{HumanInput, HumanInputMode, UserProxyAgent};

/// Role of a participant in the research crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Proxy for the human who asked the question
    User,
    /// Gathers facts with search and scraping
    Researcher,
    /// Checks the research against the brief
    ResearchManager,
    /// Owns the final answer
    Director,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::User => "user",
            AgentRole::Researcher => "researcher",
            AgentRole::ResearchManager => "research_manager",
            AgentRole::Director => "director",
        }
    }

    /// Built-in system instructions for the role
    pub fn default_instructions(&self) -> &'static str {
        match self {
            AgentRole::User => {
                "Help the user to answer their question concisely and accurately."
            }
            AgentRole::Researcher => {
                "You are a world-class researcher. Gather facts and data about the \
                 brief using web search and page scraping. Cite the URLs you used. \
                 Never make things up; if a source fails, say so and try another. \
                 Report findings to the research manager."
            }
            AgentRole::ResearchManager => {
                "You are a research manager. Break the brief into concrete research \
                 questions, review the researcher's findings for gaps and quality, \
                 and ask for follow-up research until the brief is covered."
            }
            AgentRole::Director => {
                "You are the director. Keep the group focused on the brief, combine \
                 the findings into a clear final answer for the brand, and reply \
                 with exactly TERMINATE once the answer is complete."
            }
        }
    }

    /// Termination policy applied when the config does not pick one
    pub fn default_termination(&self) -> TerminationConfig {
        match self {
            AgentRole::User => TerminationConfig::contains_terminate(),
            _ => TerminationConfig::exact_terminate(),
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reply from an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    /// Reply text as produced
    pub content: String,

    /// Tool run requested by the reply, if any
    pub tool_call: Option<ToolCall>,
}

impl AgentReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_call: None,
        }
    }

    pub fn tool(call: ToolCall) -> Self {
        Self {
            content: call.to_json(),
            tool_call: Some(call),
        }
    }
}

/// A participant in the group chat
#[async_trait]
pub trait Agent: Send + Sync {
    /// Name shown in the transcript
    fn id(&self) -> &str;

    fn role(&self) -> AgentRole;

    /// Whether `message` ends the conversation from this agent's view
    fn is_termination(&self, message: &ChatMessage) -> bool;

    /// Produce the next reply given the full history
    async fn reply(&self, history: &ConversationHistory) -> Result<AgentReply>;
}
