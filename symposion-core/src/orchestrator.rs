//! Group chat orchestration
//!
//! The orchestrator is a small state machine driving one conversation:
//!
//! ```text
//! AwaitingTurn --(round consumed)--> AgentReplying
//! AgentReplying --(tool call)------> ToolDispatch --> AwaitingTurn (same speaker)
//! AgentReplying --(plain reply)----> AwaitingTurn (next speaker)
//! any state -----(keyword, max_round, cancellation)--> Terminated
//! ```
//!
//! Assistants speak round-robin. The user proxy interjects after
//! `max_consecutive_auto_reply` assistant replies in a row. Turns are strictly
//! sequential; the history is only written here.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentReply, AgentRole};
use crate::config::ChatConfig;
use crate::conversation::{ChatMessage, ConversationHistory, MessageKind};
use crate::error::{Result, SymposionError};
use crate::tools::{ToolCall, ToolContext, ToolRegistry};

/// Callback invoked for every appended message
pub type MessageObserver = Arc<dyn Fn(&ChatMessage) + Send + Sync>;

/// Orchestrator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    AwaitingTurn,
    AgentReplying,
    ToolDispatch(ToolCall),
    Terminated(TerminationReason),
}

/// Why a conversation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// A participant's termination predicate matched the message `seq` sent by `sender`
    Keyword { sender: String, seq: u64 },
    /// The round limit was reached
    MaxRounds { limit: usize },
    /// The caller cancelled the session
    Cancelled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Keyword { sender, seq } => {
                write!(f, "termination keyword from {} at message #{}", sender, seq)
            }
            TerminationReason::MaxRounds { limit } => write!(f, "round limit ({}) reached", limit),
            TerminationReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Result of a finished conversation
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub history: ConversationHistory,
    /// Rounds consumed (the opening message is not a round)
    pub rounds: usize,
    pub reason: TerminationReason,
}

/// Limits of one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLimits {
    pub max_round: usize,
    pub max_consecutive_auto_reply: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_round: 20,
            max_consecutive_auto_reply: 10,
        }
    }
}

impl From<&ChatConfig> for ChatLimits {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_round: config.max_round,
            max_consecutive_auto_reply: config.max_consecutive_auto_reply,
        }
    }
}

/// Drives a bounded, turn-sequential group chat
pub struct ChatOrchestrator {
    proxy: Arc<dyn Agent>,
    assistants: Vec<Arc<dyn Agent>>,
    registry: Arc<ToolRegistry>,
    limits: ChatLimits,
    cancellation: CancellationToken,
    trace_id: String,
    observer: Option<MessageObserver>,
}

impl ChatOrchestrator {
    /// # Errors
    ///
    /// Requires exactly one agent with the user role and at least one other.
    pub fn new(agents: Vec<Arc<dyn Agent>>, registry: Arc<ToolRegistry>) -> Result<Self> {
        let (proxies, assistants): (Vec<_>, Vec<_>) = agents
            .into_iter()
            .partition(|a| a.role() == AgentRole::User);

        let mut proxies = proxies.into_iter();
        let (Some(proxy), None) = (proxies.next(), proxies.next()) else {
            return Err(SymposionError::Configuration(
                "group chat needs exactly one user proxy".to_string(),
            ));
        };
        if assistants.is_empty() {
            return Err(SymposionError::Configuration(
                "group chat needs at least one assistant".to_string(),
            ));
        }

        Ok(Self {
            proxy,
            assistants,
            registry,
            limits: ChatLimits::default(),
            cancellation: CancellationToken::new(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            observer: None,
        })
    }

    pub fn with_limits(mut self, limits: ChatLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    pub fn with_observer(mut self, observer: MessageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn limits(&self) -> ChatLimits {
        self.limits
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn proxy_id(&self) -> &str {
        self.proxy.id()
    }

    /// Run a conversation opened by the proxy with `opening`
    pub async fn run(&self, opening: &str) -> ChatOutcome {
        let mut history = ConversationHistory::new();
        let mut rounds = 0usize;
        let mut speaker = 0usize;
        let mut proxy_turn = false;
        let mut auto_replies = 0usize;

        tracing::info!(
            trace_id = %self.trace_id,
            agents = self.assistants.len() + 1,
            max_round = self.limits.max_round,
            "Starting group chat"
        );

        let mut state = match self.record(&mut history, self.proxy.id(), opening, MessageKind::Text)
        {
            Some(reason) => ChatState::Terminated(reason),
            None => ChatState::AwaitingTurn,
        };

        loop {
            state = match state {
                ChatState::Terminated(reason) => {
                    tracing::info!(
                        trace_id = %self.trace_id,
                        rounds,
                        messages = history.len(),
                        reason = %reason,
                        "Group chat finished"
                    );
                    return ChatOutcome {
                        history,
                        rounds,
                        reason,
                    };
                }

                ChatState::AwaitingTurn => {
                    if self.cancellation.is_cancelled() {
                        ChatState::Terminated(TerminationReason::Cancelled)
                    } else if rounds >= self.limits.max_round {
                        ChatState::Terminated(TerminationReason::MaxRounds {
                            limit: self.limits.max_round,
                        })
                    } else {
                        rounds += 1;
                        ChatState::AgentReplying
                    }
                }

                ChatState::AgentReplying => {
                    let agent = if proxy_turn {
                        &self.proxy
                    } else {
                        &self.assistants[speaker]
                    };
                    tracing::info!(round = rounds, agent = %agent.id(), "Next speaker");

                    let reply = tokio::select! {
                        _ = self.cancellation.cancelled() => None,
                        reply = agent.reply(&history) => Some(reply),
                    };

                    match reply {
                        None => ChatState::Terminated(TerminationReason::Cancelled),
                        Some(Ok(AgentReply {
                            content,
                            tool_call: Some(call),
                        })) => {
                            match self.record(&mut history, agent.id(), content, MessageKind::ToolCall)
                            {
                                Some(reason) => ChatState::Terminated(reason),
                                None => ChatState::ToolDispatch(call),
                            }
                        }
                        Some(Ok(AgentReply { content, .. })) => {
                            let outcome =
                                self.record(&mut history, agent.id(), content, MessageKind::Text);
                            self.advance(&mut speaker, &mut proxy_turn, &mut auto_replies);
                            match outcome {
                                Some(reason) => ChatState::Terminated(reason),
                                None => ChatState::AwaitingTurn,
                            }
                        }
                        Some(Err(err)) => {
                            tracing::warn!(agent = %agent.id(), error = %err, "Agent reply failed");
                            let outcome = self.record(
                                &mut history,
                                agent.id(),
                                format!("[AgentError] {}", err),
                                MessageKind::Error,
                            );
                            self.advance(&mut speaker, &mut proxy_turn, &mut auto_replies);
                            match outcome {
                                Some(reason) => ChatState::Terminated(reason),
                                None => ChatState::AwaitingTurn,
                            }
                        }
                    }
                }

                ChatState::ToolDispatch(call) => {
                    let agent_id = if proxy_turn {
                        self.proxy.id()
                    } else {
                        self.assistants[speaker].id()
                    };
                    let ctx = ToolContext::new()
                        .with_agent_id(agent_id)
                        .with_trace_id(&self.trace_id)
                        .with_cancellation(self.cancellation.clone());

                    let result = self.registry.dispatch(&call, &ctx).await;
                    match self.record(
                        &mut history,
                        &call.tool_name,
                        result.content,
                        MessageKind::ToolResult,
                    ) {
                        Some(reason) => ChatState::Terminated(reason),
                        // same speaker goes again with the result in view
                        None => ChatState::AwaitingTurn,
                    }
                }
            };
        }
    }

    /// Move to the next speaker after a plain reply
    fn advance(&self, speaker: &mut usize, proxy_turn: &mut bool, auto_replies: &mut usize) {
        if *proxy_turn {
            *proxy_turn = false;
            *auto_replies = 0;
            return;
        }
        *speaker = (*speaker + 1) % self.assistants.len();
        *auto_replies += 1;
        if *auto_replies >= self.limits.max_consecutive_auto_reply {
            *proxy_turn = true;
        }
    }

    /// Append a message, notify the observer and test every termination
    /// predicate against it
    fn record(
        &self,
        history: &mut ConversationHistory,
        sender: &str,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> Option<TerminationReason> {
        let message = history.append(sender, content, kind);
        tracing::debug!(
            seq = message.seq(),
            sender = %message.sender(),
            kind = ?message.kind(),
            chars = message.content().chars().count(),
            "Message appended"
        );
        if let Some(observer) = &self.observer {
            observer(message);
        }

        // tool output is third-party text and never ends the chat
        if message.kind() == MessageKind::ToolResult {
            return None;
        }

        std::iter::once(&self.proxy)
            .chain(self.assistants.iter())
            .find(|agent| agent.is_termination(message))
            .map(|agent| {
                tracing::info!(
                    agent = %agent.id(),
                    sender = %message.sender(),
                    seq = message.seq(),
                    "Termination predicate matched"
                );
                TerminationReason::Keyword {
                    sender: message.sender().to_string(),
                    seq: message.seq(),
                }
            })
    }
}
