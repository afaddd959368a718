//! Tool registry and dispatch
//!
//! The registry owns one handler per [`ToolId`] and turns every agent tool
//! call into a [`ToolResult`]. Dispatch never returns an error: unknown names,
//! bad arguments, handler failures, timeouts and cancellation all come back
//! as failed results the conversation can see.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use super::result::{ToolError, ToolProvenance, ToolResult};
use super::tool::{ErasedTool, Tool, ToolCall, ToolContext, ToolId, ToolMetadata};

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A handler for this tool is already registered
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(ToolId),
}

/// Timeouts applied around handler execution
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Default timeout for a tool call
    pub default_timeout: Duration,

    /// Per-tool overrides
    pub tool_timeouts: HashMap<ToolId, Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300),
            tool_timeouts: HashMap::new(),
        }
    }
}

impl DispatchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, tool: ToolId, timeout: Duration) -> Self {
        self.tool_timeouts.insert(tool, timeout);
        self
    }

    fn timeout_for(&self, tool: ToolId) -> Duration {
        self.tool_timeouts
            .get(&tool)
            .copied()
            .unwrap_or(self.default_timeout)
    }
}

/// Registry of tool handlers keyed by [`ToolId`]
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolId, Arc<dyn ErasedTool>>,
    config: DispatchConfig,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.ids())
            .field("config", &self.config)
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            tools: BTreeMap::new(),
            config,
        }
    }

    /// Register a tool under the identifier its metadata declares
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] if that identifier is taken.
    pub fn register<T>(&mut self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        let id = Tool::metadata(&tool).id;
        if self.tools.contains_key(&id) {
            return Err(RegistryError::DuplicateTool(id));
        }
        self.tools.insert(id, Arc::new(tool));
        Ok(())
    }

    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.contains_key(&id)
    }

    /// Registered identifiers, in stable order
    pub fn ids(&self) -> Vec<ToolId> {
        self.tools.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn metadata(&self, id: ToolId) -> Option<ToolMetadata> {
        self.tools.get(&id).map(|t| t.metadata())
    }

    /// Tool catalogue for every registered tool
    pub fn describe(&self) -> String {
        self.describe_for(&self.ids())
    }

    /// Tool catalogue for a subset of tools, as placed in a system prompt
    pub fn describe_for(&self, ids: &[ToolId]) -> String {
        let mut out = String::from(
            "You can call tools. To call one, reply with only a JSON object of the form\n\
             {\"tool\": \"<name>\", \"arguments\": {\"<argument>\": \"<value>\"}}\n\
             and wait for the result before continuing.\n\nAvailable tools:\n",
        );
        for id in ids {
            let Some(metadata) = self.metadata(*id) else {
                continue;
            };
            let _ = writeln!(out, "- {}: {}", metadata.id, metadata.description);
            for parameter in &metadata.parameters {
                let _ = writeln!(
                    out,
                    "    {} ({}): {}",
                    parameter.name,
                    if parameter.required { "required" } else { "optional" },
                    parameter.description
                );
            }
            let _ = writeln!(out, "    returns: {}", metadata.returns);
        }
        out
    }

    /// Dispatch one tool call
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let mut provenance = ToolProvenance::new(&call.tool_name, args_hash(call));
        if let Some(agent_id) = &ctx.agent_id {
            provenance = provenance.with_agent_id(agent_id);
        }
        if let Some(trace_id) = &ctx.trace_id {
            provenance = provenance.with_trace_id(trace_id);
        }

        let outcome = self.execute(call, ctx).await;
        let provenance = provenance.with_duration(started.elapsed());

        match outcome {
            Ok(content) => {
                tracing::info!(
                    tool = %call.tool_name,
                    agent = ctx.agent_id.as_deref().unwrap_or("-"),
                    duration_ms = provenance.duration.as_millis() as u64,
                    chars = content.chars().count(),
                    "Tool call succeeded"
                );
                ToolResult::success(content, provenance)
            }
            Err(error) => {
                tracing::warn!(
                    tool = %call.tool_name,
                    agent = ctx.agent_id.as_deref().unwrap_or("-"),
                    kind = %error.kind,
                    status = error.status,
                    error = %error.message,
                    "Tool call failed"
                );
                ToolResult::failure(error, provenance)
            }
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        if ctx.is_cancelled() {
            return Err(ToolError::cancelled("cancelled before execution"));
        }

        let id: ToolId = call
            .tool_name
            .parse()
            .map_err(|_| ToolError::unknown_tool(&call.tool_name))?;
        let tool = self
            .tools
            .get(&id)
            .ok_or_else(|| ToolError::unknown_tool(&call.tool_name))?;

        let pending = tool.prepare(&call.arguments, ctx)?;
        let limit = self.config.timeout_for(id);

        tracing::debug!(tool = %id, timeout_ms = limit.as_millis() as u64, "Dispatching tool call");

        let run = async {
            match timeout(limit, pending).await {
                Ok(Ok(content)) => Ok(content),
                Ok(Err(err)) => Err(ToolError::from(&err)),
                Err(_) => Err(ToolError::timeout(limit)),
            }
        };

        match &ctx.cancellation {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ToolError::cancelled("execution cancelled")),
                res = run => res,
            },
            None => run.await,
        }
    }
}

fn args_hash(call: &ToolCall) -> String {
    // BTreeMap keeps the serialization canonical
    let canonical = serde_json::to_string(&call.arguments).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}
