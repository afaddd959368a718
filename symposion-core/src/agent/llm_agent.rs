//! Agent backed by a generation provider

use async_trait::async_trait;
use std::sync::Arc;

use super::parse::parse_tool_call;
use super::termination::{TerminationConfig, TerminationPolicy};
use super::{Agent, AgentReply, AgentRole};
use crate::config::AgentConfig;
use crate::conversation::{ChatMessage, ConversationHistory};
use crate::error::{Result, SymposionError};
use crate::llm::{LLMProvider, LLMRequest, Message, RetryBudget, RetryConfig, with_retry_if};

/// A researcher, manager or director driven by an LLM
pub struct LlmAgent {
    id: String,
    role: AgentRole,
    instructions: String,
    tool_catalogue: Option<String>,
    llm: Arc<dyn LLMProvider>,
    termination: Box<dyn TerminationPolicy>,
    retry: RetryConfig,
    budget: Option<RetryBudget>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl LlmAgent {
    pub fn new(id: impl Into<String>, role: AgentRole, llm: Arc<dyn LLMProvider>) -> Self {
        Self {
            id: id.into(),
            role,
            instructions: role.default_instructions().to_string(),
            tool_catalogue: None,
            llm,
            termination: role.default_termination().build(),
            retry: RetryConfig::default(),
            budget: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Build from an agent entry; `tool_catalogue` is only given to agents
    /// that were granted tools
    pub fn from_config(
        config: &AgentConfig,
        llm: Arc<dyn LLMProvider>,
        tool_catalogue: Option<String>,
    ) -> Self {
        let agent = Self::new(&config.name, config.role, llm)
            .with_instructions(config.effective_instructions())
            .with_termination(&config.effective_termination());
        match tool_catalogue {
            Some(catalogue) if !config.tools.is_empty() => agent.with_tool_catalogue(catalogue),
            _ => agent,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_tool_catalogue(mut self, catalogue: impl Into<String>) -> Self {
        self.tool_catalogue = Some(catalogue.into());
        self
    }

    pub fn with_termination(mut self, termination: &TerminationConfig) -> Self {
        self.termination = termination.build();
        self
    }

    /// Retry generation failures, drawing from a shared budget
    pub fn with_retry(mut self, retry: RetryConfig, budget: Option<RetryBudget>) -> Self {
        self.retry = retry;
        self.budget = budget;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn has_tools(&self) -> bool {
        self.tool_catalogue.is_some()
    }

    /// System prompt: instructions, then the tool catalogue when granted
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}, the {} in a research group chat.\n{}",
            self.id,
            self.role.as_str().replace('_', " "),
            self.instructions
        );
        if let Some(catalogue) = &self.tool_catalogue {
            prompt.push_str("\n\n");
            prompt.push_str(catalogue);
        }
        prompt
    }

    fn build_request(&self, history: &ConversationHistory) -> LLMRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.system_prompt()));
        messages.extend(history.to_llm_messages(&self.id));

        let mut request = LLMRequest::from_messages(messages);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn role(&self) -> AgentRole {
        self.role
    }

    fn is_termination(&self, message: &ChatMessage) -> bool {
        self.termination.should_terminate(message)
    }

    async fn reply(&self, history: &ConversationHistory) -> Result<AgentReply> {
        let request = self.build_request(history);

        let response = with_retry_if(
            &self.retry,
            self.budget.as_ref(),
            SymposionError::is_transient,
            || self.llm.generate_request(&request),
        )
        .await?;

        let content = response.content.trim().to_string();
        if content.is_empty() {
            return Err(SymposionError::Agent(format!(
                "{} produced an empty reply",
                self.id
            )));
        }

        if self.has_tools() {
            if let Some(call) = parse_tool_call(&content) {
                tracing::info!(agent = %self.id, tool = %call.tool_name, "Agent requested a tool");
                return Ok(AgentReply {
                    content: call.to_json(),
                    tool_call: Some(call),
                });
            }
        }

        Ok(AgentReply::text(content))
    }
}
