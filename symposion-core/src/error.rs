//! Error types for Symposion operations

/// Result type for Symposion operations
pub type Result<T> = std::result::Result<T, SymposionError>;

/// Error types for the research chat
#[derive(Debug, thiserror::Error)]
pub enum SymposionError {
    /// Transport-level failure reaching an external endpoint
    #[error("Network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// Credential rejected by an external endpoint (HTTP 401/403)
    #[error("Authentication rejected by {endpoint} (HTTP {status}): {body}")]
    Auth {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Search provider reachable but returned a non-success status
    #[error("Search provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    /// Render service reachable but returned a non-200 status
    #[error("Render service returned HTTP {status}: {body}")]
    Render { status: u16, body: String },

    /// Generation capability failed while summarizing
    #[error("Summarization failed: {0}")]
    Summarization(String),

    /// Dispatch requested a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Invalid input to a tool or component
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generation capability (LLM) error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Generation endpoint reachable but returned a non-success status
    #[error("LLM API returned HTTP {status}: {message}")]
    LlmApi { status: u16, message: String },

    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SymposionError {
    /// Build the error for a failed `reqwest` send.
    pub fn network(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SymposionError::Network {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SymposionError::Auth { status, .. }
            | SymposionError::Provider { status, .. }
            | SymposionError::Render { status, .. }
            | SymposionError::LlmApi { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error is worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        match self {
            SymposionError::Network { .. } => true,
            SymposionError::Provider { status, .. }
            | SymposionError::Render { status, .. }
            | SymposionError::LlmApi { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<String> for SymposionError {
    fn from(s: String) -> Self {
        SymposionError::Other(s)
    }
}

impl From<&str> for SymposionError {
    fn from(s: &str) -> Self {
        SymposionError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for SymposionError {
    fn from(err: anyhow::Error) -> Self {
        SymposionError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_transience() {
        let auth = SymposionError::Auth {
            endpoint: "search".to_string(),
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(auth.status(), Some(403));
        assert!(!auth.is_transient());

        let busy = SymposionError::Provider {
            status: 503,
            body: String::new(),
        };
        assert!(busy.is_transient());

        let bad_request = SymposionError::Render {
            status: 400,
            body: "bad url".to_string(),
        };
        assert!(!bad_request.is_transient());
        assert!(SymposionError::network("render", "connection refused").is_transient());

        let rejected_key = SymposionError::LlmApi {
            status: 401,
            message: "Incorrect API key provided".to_string(),
        };
        assert_eq!(rejected_key.status(), Some(401));
        assert!(!rejected_key.is_transient());
        assert!(
            SymposionError::LlmApi {
                status: 429,
                message: "slow down".to_string()
            }
            .is_transient()
        );
        assert!(!SymposionError::Llm("no choices".to_string()).is_transient());
    }
}
