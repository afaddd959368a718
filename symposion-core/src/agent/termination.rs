//! Chat termination predicates

use serde::{Deserialize, Serialize};

use crate::conversation::ChatMessage;

/// The keyword agents use to end a conversation
pub const TERMINATE: &str = "TERMINATE";

/// Decides whether a message ends the conversation
pub trait TerminationPolicy: Send + Sync + std::fmt::Debug {
    fn should_terminate(&self, message: &ChatMessage) -> bool;
}

/// Ends the chat when the content contains the keyword anywhere
#[derive(Debug, Clone)]
pub struct ContainsKeyword {
    keyword: String,
}

impl ContainsKeyword {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }
}

impl TerminationPolicy for ContainsKeyword {
    fn should_terminate(&self, message: &ChatMessage) -> bool {
        message.content().contains(&self.keyword)
    }
}

/// Ends the chat when the trimmed content is exactly the keyword
#[derive(Debug, Clone)]
pub struct ExactKeyword {
    keyword: String,
}

impl ExactKeyword {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }
}

impl TerminationPolicy for ExactKeyword {
    fn should_terminate(&self, message: &ChatMessage) -> bool {
        message.content().trim() == self.keyword
    }
}

/// Never ends the chat
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTerminate;

impl TerminationPolicy for NeverTerminate {
    fn should_terminate(&self, _message: &ChatMessage) -> bool {
        false
    }
}

/// Serializable choice of termination policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminationConfig {
    Contains { keyword: String },
    Exact { keyword: String },
    Never,
}

impl TerminationConfig {
    pub fn contains_terminate() -> Self {
        TerminationConfig::Contains {
            keyword: TERMINATE.to_string(),
        }
    }

    pub fn exact_terminate() -> Self {
        TerminationConfig::Exact {
            keyword: TERMINATE.to_string(),
        }
    }

    pub fn build(&self) -> Box<dyn TerminationPolicy> {
        match self {
            TerminationConfig::Contains { keyword } => Box::new(ContainsKeyword::new(keyword)),
            TerminationConfig::Exact { keyword } => Box::new(ExactKeyword::new(keyword)),
            TerminationConfig::Never => Box::new(NeverTerminate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationHistory, MessageKind};

    fn message(content: &str) -> ChatMessage {
        let mut history = ConversationHistory::new();
        history.append("researcher", content, MessageKind::Text).clone()
    }

    #[test]
    fn test_contains_keyword() {
        let policy = TerminationConfig::contains_terminate().build();
        assert!(policy.should_terminate(&message("All done. TERMINATE")));
        assert!(!policy.should_terminate(&message("terminate later")));
    }

    #[test]
    fn test_exact_keyword_trims() {
        let policy = TerminationConfig::exact_terminate().build();
        assert!(policy.should_terminate(&message("  TERMINATE\n")));
        assert!(!policy.should_terminate(&message("Report attached. TERMINATE")));
    }

    #[test]
    fn test_never() {
        assert!(!TerminationConfig::Never.build().should_terminate(&message("TERMINATE")));
    }

    #[test]
    fn test_config_serde() {
        let config: TerminationConfig =
            serde_json::from_str(r#"{"type":"contains","keyword":"DONE"}"#).unwrap();
        assert_eq!(
            config,
            TerminationConfig::Contains {
                keyword: "DONE".to_string()
            }
        );
    }
}
