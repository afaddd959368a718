//! Structured tool results and the tool error taxonomy
//!
//! Every dispatch produces a [`ToolResult`], successful or not. Failures keep
//! their kind tag and HTTP status so agents (and logs) can tell an expired
//! credential from a flaky network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SymposionError;

/// Result of a single tool dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text handed back to the conversation
    pub content: String,

    /// Whether the tool succeeded
    pub ok: bool,

    /// Structured failure, present exactly when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,

    /// Who ran what, and how long it took
    pub provenance: ToolProvenance,
}

impl ToolResult {
    /// Successful result carrying the tool output verbatim
    pub fn success(content: impl Into<String>, provenance: ToolProvenance) -> Self {
        Self {
            content: content.into(),
            ok: true,
            error: None,
            provenance,
        }
    }

    /// Failed result; the content is the rendered error
    pub fn failure(error: ToolError, provenance: ToolProvenance) -> Self {
        Self {
            content: error.to_string(),
            ok: false,
            error: Some(error),
            provenance,
        }
    }

    /// Error kind, if the dispatch failed
    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Whether a caller could reasonably try the same call again
    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(ToolError::is_retryable)
    }
}

/// Structured tool error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error kind tag
    pub kind: ToolErrorKind,

    /// Human-readable message
    pub message: String,

    /// HTTP status for endpoint failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Attach an HTTP status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(
            ToolErrorKind::UnknownToolError,
            format!("no tool named '{}' is registered", name),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ValidationError, message)
    }

    pub fn timeout(duration: Duration) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("tool execution timed out after {:?}", duration),
        )
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Cancelled, reason)
    }

    /// Retryable kinds, plus provider/render throttling and server errors
    pub fn is_retryable(&self) -> bool {
        if self.kind.is_retryable() {
            return true;
        }
        matches!(
            self.kind,
            ToolErrorKind::ProviderError | ToolErrorKind::RenderError
        ) && self.status.is_some_and(|s| s == 429 || s >= 500)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<&SymposionError> for ToolError {
    fn from(err: &SymposionError) -> Self {
        let kind = match err {
            SymposionError::Network { .. } => ToolErrorKind::NetworkError,
            SymposionError::Auth { .. } => ToolErrorKind::AuthError,
            SymposionError::Provider { .. } => ToolErrorKind::ProviderError,
            SymposionError::Render { .. } => ToolErrorKind::RenderError,
            SymposionError::Summarization(_) => ToolErrorKind::SummarizationError,
            SymposionError::UnknownTool(_) => ToolErrorKind::UnknownToolError,
            SymposionError::Validation(_) => ToolErrorKind::ValidationError,
            _ => ToolErrorKind::Internal,
        };
        let error = ToolError::new(kind, err.to_string());
        match err.status() {
            Some(status) => error.with_status(status),
            None => error,
        }
    }
}

impl From<SymposionError> for ToolError {
    fn from(err: SymposionError) -> Self {
        ToolError::from(&err)
    }
}

/// Error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolErrorKind {
    /// Endpoint unreachable or timed out at the transport level
    NetworkError,
    /// Credential rejected (401/403)
    AuthError,
    /// Search provider answered with a non-success status
    ProviderError,
    /// Render service answered with a non-200 status
    RenderError,
    /// Summarization aborted
    SummarizationError,
    /// No tool registered under the requested name
    UnknownToolError,
    /// Arguments missing or malformed
    ValidationError,
    /// Per-tool timeout elapsed
    Timeout,
    /// Caller cancelled the dispatch
    Cancelled,
    /// Anything else
    Internal,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::NetworkError => "NetworkError",
            ToolErrorKind::AuthError => "AuthError",
            ToolErrorKind::ProviderError => "ProviderError",
            ToolErrorKind::RenderError => "RenderError",
            ToolErrorKind::SummarizationError => "SummarizationError",
            ToolErrorKind::UnknownToolError => "UnknownToolError",
            ToolErrorKind::ValidationError => "ValidationError",
            ToolErrorKind::Timeout => "Timeout",
            ToolErrorKind::Cancelled => "Cancelled",
            ToolErrorKind::Internal => "Internal",
        }
    }

    /// Check if this error kind is retryable regardless of status
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolErrorKind::NetworkError | ToolErrorKind::Timeout)
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance metadata for tracing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolProvenance {
    /// Tool name as requested
    pub tool_name: String,

    /// Truncated SHA-256 of the canonical arguments
    pub args_hash: String,

    /// Agent that requested the call
    pub agent_id: Option<String>,

    /// Session trace id
    pub trace_id: Option<String>,

    /// When dispatch started
    pub started_at: DateTime<Utc>,

    /// Dispatch duration
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ToolProvenance {
    pub fn new(tool_name: impl Into<String>, args_hash: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args_hash: args_hash.into(),
            agent_id: None,
            trace_id: None,
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

// Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
