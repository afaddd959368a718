//! Configuration types for Symposion
//!
//! Everything a research session needs is enumerated here and resolved once
//! at startup. Missing secrets are reported by [`SymposionConfig::validate`]
//! before any client or agent is constructed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::agent::{AgentRole, HumanInputMode, TerminationConfig};
use crate::error::{Result, SymposionError};
use crate::summarize::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SUMMARY_THRESHOLD};
use crate::tools::ToolId;

const REDACTED: &str = "********";

/// Main configuration for a research session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymposionConfig {
    /// Web search endpoint
    pub search: SearchConfig,

    /// Headless-browser render endpoint
    pub render: RenderConfig,

    /// Map-reduce summarization settings
    pub summarizer: SummarizerConfig,

    /// Default generation provider for agents and the summarizer
    pub llm: LLMProviderConfig,

    /// Group chat settings
    pub chat: ChatConfig,

    /// Backoff applied to agent generation calls
    pub retry: RetrySettings,

    /// Chat participants, in speaking order
    pub agents: Vec<AgentConfig>,
}

impl Default for SymposionConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            render: RenderConfig::default(),
            summarizer: SummarizerConfig::default(),
            llm: LLMProviderConfig::default(),
            chat: ChatConfig::default(),
            retry: RetrySettings::default(),
            agents: default_agents(),
        }
    }
}

/// Search endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search API URL
    pub endpoint: String,

    /// Value for the `X-API-KEY` header (falls back to `SERPER_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Render endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render API URL; the token is appended as a query parameter
    pub endpoint: String,

    /// Render service token (falls back to `BROWSERLESS_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://chrome.browserless.io/content".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Summarizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters of trailing context carried into the next chunk
    pub chunk_overlap: usize,

    /// Page text longer than this (in characters) is summarized
    pub threshold: usize,

    /// Sampling temperature for summary generation
    pub temperature: f32,

    /// Maximum tokens per generated summary
    pub max_tokens: usize,

    /// Model override for summarization (defaults to `llm.model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            threshold: DEFAULT_SUMMARY_THRESHOLD,
            temperature: 0.0,
            max_tokens: 1024,
            model: None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Provider type
    pub provider: LLMProvider,

    /// Model name
    pub model: String,

    /// API key (falls back to `OPENAI_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for OpenAI-compatible endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for LLMProviderConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            model: "gpt-4o".to_string(),
            api_key: None,
            base_url: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
}

/// Group chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Upper bound on agent turns per session
    pub max_round: usize,

    /// Assistant replies in a row before the user proxy is invited to speak
    pub max_consecutive_auto_reply: usize,

    /// Whether the user proxy asks a human when invited
    pub human_input: HumanInputMode,

    /// Message the user proxy sends when no human answer is requested
    pub auto_reply: String,

    /// Timeout applied to each tool dispatch
    #[serde(with = "humantime_serde")]
    pub tool_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_round: 20,
            max_consecutive_auto_reply: 10,
            human_input: HumanInputMode::Always,
            auto_reply: "Please continue. Reply TERMINATE once the brief is fully answered."
                .to_string(),
            tool_timeout: Duration::from_secs(300),
        }
    }
}

/// Retry settings for generation calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts per call, including the first
    pub max_attempts: usize,

    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Cap on a single backoff delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Total retries allowed across the whole session
    pub budget: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            budget: 10,
        }
    }
}

/// One chat participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent identifier shown in the transcript
    pub name: String,

    /// Role in the group chat
    pub role: AgentRole,

    /// System instructions (defaults to the role's built-in instructions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Tools this agent may call
    #[serde(default)]
    pub tools: Vec<ToolId>,

    /// Termination predicate (defaults to the role's policy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationConfig>,

    /// Provider override for this agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LLMProviderConfig>,
}

impl AgentConfig {
    /// Create an agent entry with role defaults
    pub fn new(name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            name: name.into(),
            role,
            instructions: None,
            tools: Vec::new(),
            termination: None,
            llm: None,
        }
    }

    /// Grant a tool
    pub fn with_tool(mut self, tool: ToolId) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }

    /// Set instructions
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the termination policy
    pub fn with_termination(mut self, termination: TerminationConfig) -> Self {
        self.termination = Some(termination);
        self
    }

    /// Instructions actually sent to the model
    pub fn effective_instructions(&self) -> String {
        self.instructions
            .clone()
            .unwrap_or_else(|| self.role.default_instructions().to_string())
    }

    /// Termination policy actually applied
    pub fn effective_termination(&self) -> TerminationConfig {
        self.termination
            .clone()
            .unwrap_or_else(|| self.role.default_termination())
    }
}

fn default_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new("user_proxy", AgentRole::User),
        AgentConfig::new("researcher", AgentRole::Researcher)
            .with_tool(ToolId::GoogleSearch)
            .with_tool(ToolId::WebScraping),
        AgentConfig::new("research_manager", AgentRole::ResearchManager),
        AgentConfig::new("director", AgentRole::Director),
    ]
}

impl SymposionConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `symposion.toml` in the working directory
    /// 3. File named by `SYMPOSION_CONFIG_PATH`
    /// 4. Well-known secret variables (`SERPER_API_KEY`, `BROWSERLESS_API_KEY`, `OPENAI_API_KEY`)
    /// 5. `SYMPOSION_` prefixed overrides, `__` separating nested keys
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or a required secret is missing.
    pub fn load() -> Result<Self> {
        use figment::providers::{Format, Toml};

        let mut figment = Self::base_figment().merge(Toml::file("symposion.toml"));

        if let Ok(path) = std::env::var("SYMPOSION_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file path, still honouring env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or validation fails.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SymposionError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        use figment::providers::{Format, Toml};

        let figment = Self::base_figment().merge(Toml::file(path));
        Self::finish(figment)
    }

    fn base_figment() -> figment::Figment {
        use figment::{Figment, providers::Serialized};

        Figment::from(Serialized::defaults(SymposionConfig::default()))
    }

    fn finish(figment: figment::Figment) -> Result<Self> {
        use figment::providers::Env;

        let config: SymposionConfig = figment
            .merge(
                Env::raw()
                    .only(&["SERPER_API_KEY"])
                    .map(|_| "search.api_key".into()),
            )
            .merge(
                Env::raw()
                    .only(&["BROWSERLESS_API_KEY"])
                    .map(|_| "render.api_key".into()),
            )
            .merge(
                Env::raw()
                    .only(&["OPENAI_API_KEY"])
                    .map(|_| "llm.api_key".into()),
            )
            .merge(Env::prefixed("SYMPOSION_").ignore(&["CONFIG_PATH"]).split("__"))
            .extract()
            .map_err(|e| {
                SymposionError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Provider settings for a given agent (its override, or the shared default)
    pub fn llm_for(&self, agent: &AgentConfig) -> LLMProviderConfig {
        let mut llm = agent.llm.clone().unwrap_or_else(|| self.llm.clone());
        if llm.api_key.is_none() {
            llm.api_key = self.llm.api_key.clone();
        }
        llm
    }

    /// Provider settings for the summarizer
    pub fn summarizer_llm(&self) -> LLMProviderConfig {
        let mut llm = self.llm.clone();
        if let Some(model) = &self.summarizer.model {
            llm.model = model.clone();
        }
        llm
    }

    /// Copy of the configuration with every secret masked
    pub fn redacted(&self) -> Self {
        fn mask(secret: &mut Option<String>) {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        }

        let mut config = self.clone();
        mask(&mut config.search.api_key);
        mask(&mut config.render.api_key);
        mask(&mut config.llm.api_key);
        for agent in &mut config.agents {
            if let Some(llm) = agent.llm.as_mut() {
                mask(&mut llm.api_key);
            }
        }
        config
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SymposionError::Configuration`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        fn require(secret: &Option<String>, what: &str, env: &str) -> Result<()> {
            match secret.as_deref().map(str::trim) {
                Some(value) if !value.is_empty() => Ok(()),
                _ => Err(SymposionError::Configuration(format!(
                    "{} is not set (set {} or the config file entry)",
                    what, env
                ))),
            }
        }

        require(&self.search.api_key, "search.api_key", "SERPER_API_KEY")?;
        require(&self.render.api_key, "render.api_key", "BROWSERLESS_API_KEY")?;
        require(&self.llm.api_key, "llm.api_key", "OPENAI_API_KEY")?;

        if self.summarizer.chunk_size == 0 {
            return Err(SymposionError::Configuration(
                "summarizer.chunk_size must be positive".to_string(),
            ));
        }
        if self.summarizer.chunk_overlap >= self.summarizer.chunk_size {
            return Err(SymposionError::Configuration(format!(
                "summarizer.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.summarizer.chunk_overlap, self.summarizer.chunk_size
            )));
        }
        if self.chat.max_round == 0 {
            return Err(SymposionError::Configuration(
                "chat.max_round must be positive".to_string(),
            ));
        }

        let proxies = self
            .agents
            .iter()
            .filter(|a| a.role == AgentRole::User)
            .count();
        if proxies != 1 {
            return Err(SymposionError::Configuration(format!(
                "exactly one agent with role 'user' is required, found {}",
                proxies
            )));
        }
        if self.agents.iter().all(|a| a.role == AgentRole::User) {
            return Err(SymposionError::Configuration(
                "at least one assistant agent is required".to_string(),
            ));
        }

        let mut names = std::collections::HashSet::new();
        for agent in &self.agents {
            if !names.insert(agent.name.as_str()) {
                return Err(SymposionError::Configuration(format!(
                    "duplicate agent name '{}'",
                    agent.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn set_secrets(jail: &mut Jail) {
        jail.set_env("SERPER_API_KEY", "serper-test");
        jail.set_env("BROWSERLESS_API_KEY", "browserless-test");
        jail.set_env("OPENAI_API_KEY", "openai-test");
    }

    #[test]
    fn test_default_crew_and_limits() {
        let config = SymposionConfig::default();
        assert_eq!(config.chat.max_round, 20);
        assert_eq!(config.chat.max_consecutive_auto_reply, 10);
        assert_eq!(config.chat.human_input, HumanInputMode::Always);
        assert_eq!(config.summarizer.chunk_size, 10_000);
        assert_eq!(config.summarizer.chunk_overlap, 500);
        assert_eq!(config.summarizer.threshold, 10_000);

        let names: Vec<_> = config.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["user_proxy", "researcher", "research_manager", "director"]
        );
        assert_eq!(config.agents[1].tools.len(), 2);
    }

    #[test]
    fn test_load_reads_secrets_from_env() {
        Jail::expect_with(|jail| {
            set_secrets(jail);
            let config = SymposionConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.search.api_key.as_deref(), Some("serper-test"));
            assert_eq!(config.render.api_key.as_deref(), Some("browserless-test"));
            assert_eq!(config.llm.api_key.as_deref(), Some("openai-test"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        Jail::expect_with(|jail| {
            jail.set_env("SERPER_API_KEY", "serper-test");
            jail.set_env("OPENAI_API_KEY", "openai-test");
            let err = SymposionConfig::load().expect_err("render key is missing");
            assert!(matches!(err, SymposionError::Configuration(_)));
            assert!(err.to_string().contains("BROWSERLESS_API_KEY"));
            Ok(())
        });
    }

    #[test]
    fn test_file_and_prefixed_env_overrides() {
        Jail::expect_with(|jail| {
            set_secrets(jail);
            jail.create_file(
                "symposion.toml",
                r#"
                [chat]
                max_round = 8
                tool_timeout = "45s"

                [summarizer]
                threshold = 4000
                "#,
            )?;
            jail.set_env("SYMPOSION_CHAT__MAX_CONSECUTIVE_AUTO_REPLY", "3");

            let config = SymposionConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.chat.max_round, 8);
            assert_eq!(config.chat.tool_timeout, Duration::from_secs(45));
            assert_eq!(config.chat.max_consecutive_auto_reply, 3);
            assert_eq!(config.summarizer.threshold, 4000);
            // untouched sections keep their defaults
            assert_eq!(config.summarizer.chunk_size, 10_000);
            Ok(())
        });
    }

    #[test]
    fn test_config_path_layers_over_local_file() {
        Jail::expect_with(|jail| {
            set_secrets(jail);
            jail.create_file("symposion.toml", "[chat]\nmax_round = 8\nmax_consecutive_auto_reply = 4\n")?;
            jail.create_file("override.toml", "[chat]\nmax_round = 15\nhuman_input = \"never\"\n")?;
            jail.set_env("SYMPOSION_CONFIG_PATH", "override.toml");

            let config = SymposionConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.chat.max_round, 15);
            assert_eq!(config.chat.max_consecutive_auto_reply, 4);
            assert_eq!(config.chat.human_input, HumanInputMode::Never);
            Ok(())
        });
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = SymposionConfig::default();
        config.search.api_key = Some("a".to_string());
        config.render.api_key = Some("b".to_string());
        config.llm.api_key = Some("c".to_string());
        config.summarizer.chunk_overlap = config.summarizer.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_requires_single_proxy() {
        let mut config = SymposionConfig::default();
        config.search.api_key = Some("a".to_string());
        config.render.api_key = Some("b".to_string());
        config.llm.api_key = Some("c".to_string());
        config.agents.push(AgentConfig::new("second_proxy", AgentRole::User));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exactly one agent"));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = SymposionConfig::default();
        config.search.api_key = Some("real-key".to_string());
        let redacted = config.redacted();
        assert_eq!(redacted.search.api_key.as_deref(), Some(REDACTED));
        assert!(redacted.render.api_key.is_none());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = SymposionConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(SymposionError::Configuration(_))));
    }
}
