//! Research session
//!
//! A [`ResearchSession`] owns everything one conversation needs: HTTP clients,
//! the summarizer, the tool registry, the agents and the orchestrator. Nothing
//! is global; dropping the session releases all of it.
//!
//! ```rust,no_run
//! use symposion_core::config::SymposionConfig;
//! use symposion_core::session::ResearchSession;
//!
//! # async fn demo() -> symposion_core::error::Result<()> {
//! let config = SymposionConfig::load()?;
//! let session = ResearchSession::builder(config).build()?;
//! let outcome = session.run("Acme", "How does Acme price its enterprise plan?").await?;
//! println!("{}", outcome.history.render_transcript());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentRole, HumanInput, LlmAgent, UserProxyAgent};
use crate::config::SymposionConfig;
use crate::error::{Result, SymposionError};
use crate::llm::{LLMProvider, LLMProviderFactory, RetryBudget, RetryConfig};
use crate::orchestrator::{ChatLimits, ChatOrchestrator, ChatOutcome, MessageObserver};
use crate::summarize::MapReduceSummarizer;
use crate::tools::{
    ContentTool, DispatchConfig, PageFetcher, SearchClient, ToolId, ToolRegistry,
};

/// Compose the proxy's opening message from the two user prompts
pub fn compose_opening(brand: &str, brief: &str) -> String {
    let brand = brand.trim();
    let brief = brief.trim();
    if brand.is_empty() {
        brief.to_string()
    } else {
        format!("Brand or company: {}\n\n{}", brand, brief)
    }
}

/// Builder for [`ResearchSession`]
pub struct SessionBuilder {
    config: SymposionConfig,
    llm: Option<Arc<dyn LLMProvider>>,
    summarizer_llm: Option<Arc<dyn LLMProvider>>,
    human_input: Option<Arc<dyn HumanInput>>,
    cancellation: CancellationToken,
    observer: Option<MessageObserver>,
}

impl SessionBuilder {
    /// Use `llm` for every agent instead of building providers from config
    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Use `llm` for summarization (defaults to the agent provider override)
    pub fn with_summarizer_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.summarizer_llm = Some(llm);
        self
    }

    pub fn with_human_input(mut self, input: Arc<dyn HumanInput>) -> Self {
        self.human_input = Some(input);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Called for every message appended to the history
    pub fn with_observer(mut self, observer: MessageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Construct clients, tools, agents and the orchestrator.
    ///
    /// # Errors
    ///
    /// Fails with [`SymposionError::Configuration`] when the configuration is
    /// invalid or a provider cannot be built.
    pub fn build(self) -> Result<ResearchSession> {
        let config = self.config;
        config.validate()?;

        let summarizer_llm = match (self.summarizer_llm, &self.llm) {
            (Some(llm), _) => llm,
            (None, Some(llm)) => llm.clone(),
            (None, None) => LLMProviderFactory::create(&config.summarizer_llm())?,
        };
        let summarizer = MapReduceSummarizer::from_config(summarizer_llm, &config.summarizer)?;

        let search = SearchClient::new(&config.search)?;
        let fetcher = PageFetcher::new(&config.render)?;
        let content = ContentTool::new(Arc::new(fetcher), Arc::new(summarizer))
            .with_threshold(config.summarizer.threshold);

        let mut registry =
            ToolRegistry::with_config(DispatchConfig::default().with_timeout(config.chat.tool_timeout));
        registry
            .register(search)
            .map_err(|e| SymposionError::Configuration(e.to_string()))?;
        registry
            .register(content)
            .map_err(|e| SymposionError::Configuration(e.to_string()))?;
        let registry = Arc::new(registry);

        let retry = RetryConfig::from(&config.retry);
        let budget = RetryBudget::new(config.retry.budget);

        let mut agents: Vec<Arc<dyn Agent>> = Vec::with_capacity(config.agents.len());
        for agent in &config.agents {
            if agent.role == AgentRole::User {
                let mut proxy = UserProxyAgent::new(&agent.name)
                    .with_mode(config.chat.human_input)
                    .with_auto_reply(&config.chat.auto_reply)
                    .with_termination(&agent.effective_termination());
                if let Some(input) = &self.human_input {
                    proxy = proxy.with_input(input.clone());
                }
                agents.push(Arc::new(proxy));
                continue;
            }

            let llm = match &self.llm {
                Some(llm) => llm.clone(),
                None => LLMProviderFactory::create(&config.llm_for(agent))?,
            };
            let catalogue = tool_catalogue(&registry, &agent.tools);
            let llm_agent = LlmAgent::from_config(agent, llm, catalogue)
                .with_retry(retry.clone(), Some(budget.clone()));
            agents.push(Arc::new(llm_agent));
        }

        let mut orchestrator = ChatOrchestrator::new(agents, registry.clone())?
            .with_limits(ChatLimits::from(&config.chat))
            .with_cancellation(self.cancellation.clone());
        if let Some(observer) = self.observer {
            orchestrator = orchestrator.with_observer(observer);
        }

        tracing::info!(
            agents = config.agents.len(),
            tools = registry.len(),
            max_round = config.chat.max_round,
            "Research session ready"
        );

        Ok(ResearchSession {
            orchestrator,
            registry,
            budget,
            cancellation: self.cancellation,
        })
    }
}

fn tool_catalogue(registry: &ToolRegistry, tools: &[ToolId]) -> Option<String> {
    if tools.is_empty() {
        None
    } else {
        Some(registry.describe_for(tools))
    }
}

/// One research conversation and everything it owns
pub struct ResearchSession {
    orchestrator: ChatOrchestrator,
    registry: Arc<ToolRegistry>,
    budget: RetryBudget,
    cancellation: CancellationToken,
}

impl ResearchSession {
    pub fn builder(config: SymposionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            llm: None,
            summarizer_llm: None,
            human_input: None,
            cancellation: CancellationToken::new(),
            observer: None,
        }
    }

    /// Token that stops the session between turns and aborts tool calls
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Generation retries left in the session budget
    pub fn retries_remaining(&self) -> usize {
        self.budget.remaining()
    }

    /// Run the conversation for `brand` and `brief`, consuming the session.
    ///
    /// # Errors
    ///
    /// An empty brief is rejected with [`SymposionError::Validation`].
    /// Failures during the chat are recorded in the history instead.
    pub async fn run(self, brand: &str, brief: &str) -> Result<ChatOutcome> {
        if brief.trim().is_empty() {
            return Err(SymposionError::Validation(
                "the brief must not be empty".to_string(),
            ));
        }

        let opening = compose_opening(brand, brief);
        tracing::info!(brand = %brand.trim(), chars = opening.chars().count(), "Starting research");
        Ok(self.orchestrator.run(&opening).await)
    }
}
