//! Group chat history
//!
//! A session owns exactly one [`ConversationHistory`]. The orchestrator is the
//! only writer; agents read it by shared reference when asked to reply.

mod history;

pub use history::{AgentId, ChatMessage, ConversationHistory, MessageKind, render_message};
