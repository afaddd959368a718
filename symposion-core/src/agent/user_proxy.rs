//! Human stand-in

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::termination::{TERMINATE, TerminationConfig, TerminationPolicy};
use super::{Agent, AgentReply, AgentRole};
use crate::conversation::{ChatMessage, ConversationHistory};
use crate::error::Result;

/// Whether the proxy consults a human when invited to speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanInputMode {
    /// Always send the configured auto-reply
    Never,
    /// Ask the human every time; falls back to the auto-reply when no input
    /// source is attached
    #[default]
    Always,
}

/// Source of human answers
#[async_trait]
pub trait HumanInput: Send + Sync {
    /// Show `prompt` and wait for an answer
    async fn ask(&self, prompt: &str) -> Result<String>;
}

/// Speaks for the human: opens the chat and interjects when invited
pub struct UserProxyAgent {
    id: String,
    mode: HumanInputMode,
    auto_reply: String,
    input: Option<Arc<dyn HumanInput>>,
    termination: Box<dyn TerminationPolicy>,
}

impl UserProxyAgent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mode: HumanInputMode::default(),
            auto_reply: "Please continue.".to_string(),
            input: None,
            termination: AgentRole::User.default_termination().build(),
        }
    }

    pub fn with_mode(mut self, mode: HumanInputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_auto_reply(mut self, auto_reply: impl Into<String>) -> Self {
        self.auto_reply = auto_reply.into();
        self
    }

    pub fn with_input(mut self, input: Arc<dyn HumanInput>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_termination(mut self, termination: &TerminationConfig) -> Self {
        self.termination = termination.build();
        self
    }

    pub fn mode(&self) -> HumanInputMode {
        self.mode
    }
}

#[async_trait]
impl Agent for UserProxyAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        AgentRole::User
    }

    fn is_termination(&self, message: &ChatMessage) -> bool {
        self.termination.should_terminate(message)
    }

    async fn reply(&self, history: &ConversationHistory) -> Result<AgentReply> {
        let input = match (self.mode, &self.input) {
            (HumanInputMode::Always, Some(input)) => input,
            _ => return Ok(AgentReply::text(self.auto_reply.clone())),
        };

        let prompt = match history.last() {
            Some(last) => format!(
                "{} said:\n{}\n\nReply (empty to continue, 'exit' to end): ",
                last.sender(),
                last.content()
            ),
            None => "Reply (empty to continue, 'exit' to end): ".to_string(),
        };

        let answer = input.ask(&prompt).await?;
        let answer = answer.trim();
        if answer.eq_ignore_ascii_case("exit") {
            tracing::info!(agent = %self.id, "Human ended the session");
            return Ok(AgentReply::text(TERMINATE));
        }
        if answer.is_empty() {
            return Ok(AgentReply::text(self.auto_reply.clone()));
        }
        Ok(AgentReply::text(answer))
    }
}
