//! Append-only group chat history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::llm::Message;

/// Identifier of a chat participant (or tool) as shown in the transcript
pub type AgentId = String;

/// What a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary reply
    Text,
    /// An agent asking for a tool run
    ToolCall,
    /// Output of a tool run, sent under the tool's name
    ToolResult,
    /// Synthetic note that a participant failed
    Error,
}

/// One immutable entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    seq: u64,
    sender: AgentId,
    content: String,
    kind: MessageKind,
    timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Ordered, append-only message log shared with every participant.
///
/// The history assigns sequence numbers; nothing can rewrite or remove an
/// entry once appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    next_seq: u64,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the stored entry
    pub fn append(
        &mut self,
        sender: impl Into<AgentId>,
        content: impl Into<String>,
        kind: MessageKind,
    ) -> &ChatMessage {
        let message = ChatMessage {
            seq: self.next_seq,
            sender: sender.into(),
            content: content.into(),
            kind,
            timestamp: Utc::now(),
        };
        self.next_seq += 1;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages sent by one participant
    pub fn from_sender<'a>(&'a self, sender: &'a str) -> impl Iterator<Item = &'a ChatMessage> {
        self.messages.iter().filter(move |m| m.sender == sender)
    }

    /// The history as seen by `perspective`: its own messages become
    /// assistant turns, everyone else's are user turns tagged with the sender
    pub fn to_llm_messages(&self, perspective: &str) -> Vec<Message> {
        self.messages
            .iter()
            .map(|m| {
                if m.sender == perspective {
                    Message::assistant(m.content.clone())
                } else {
                    Message::user(format!("[{}] {}", m.sender, m.content))
                }
            })
            .collect()
    }

    /// Plain-text transcript
    pub fn render_transcript(&self) -> String {
        let mut out = String::new();
        for m in &self.messages {
            let _ = writeln!(out, "{}", render_message(m));
        }
        out
    }
}

/// One transcript line, e.g. `#3 researcher (tool_call): {...}`
pub fn render_message(message: &ChatMessage) -> String {
    match message.kind {
        MessageKind::Text => format!("#{} {}: {}", message.seq, message.sender, message.content),
        kind => format!(
            "#{} {} ({}): {}",
            message.seq,
            message.sender,
            serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            message.content
        ),
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[test]
    fn test_append_assigns_monotonic_seq() {
        let mut history = ConversationHistory::new();
        history.append("user_proxy", "brief", MessageKind::Text);
        history.append("researcher", "{}", MessageKind::ToolCall);
        let last = history.append("google_search", "{\"organic\":[]}", MessageKind::ToolResult);

        assert_eq!(last.seq(), 2);
        let seqs: Vec<u64> = history.iter().map(ChatMessage::seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_perspective_mapping() {
        let mut history = ConversationHistory::new();
        history.append("user_proxy", "find pricing", MessageKind::Text);
        history.append("researcher", "on it", MessageKind::Text);

        let seen = history.to_llm_messages("researcher");
        assert_eq!(seen[0].role, MessageRole::User);
        assert_eq!(seen[0].content, "[user_proxy] find pricing");
        assert_eq!(seen[1].role, MessageRole::Assistant);
        assert_eq!(seen[1].content, "on it");
    }

    #[test]
    fn test_from_sender() {
        let mut history = ConversationHistory::new();
        history.append("a", "1", MessageKind::Text);
        history.append("b", "2", MessageKind::Text);
        history.append("a", "3", MessageKind::Text);
        assert_eq!(history.from_sender("a").count(), 2);
    }

    #[test]
    fn test_render_transcript() {
        let mut history = ConversationHistory::new();
        history.append("user_proxy", "hi", MessageKind::Text);
        history.append("web_scraping", "[AuthError] nope", MessageKind::ToolResult);

        let transcript = history.render_transcript();
        assert_eq!(
            transcript,
            "#0 user_proxy: hi\n#1 web_scraping (tool_result): [AuthError] nope\n"
        );
    }
}
