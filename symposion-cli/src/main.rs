//! Symposion CLI - run research sessions and the individual tools

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use symposion_core::agent::{HumanInput, HumanInputMode};
use symposion_core::config::SymposionConfig;
use symposion_core::conversation::{ChatMessage, render_message};
use symposion_core::error::SymposionError;
use symposion_core::llm::{LLMProviderFactory, RetryConfig, with_retry_if};
use symposion_core::session::ResearchSession;
use symposion_core::summarize::MapReduceSummarizer;
use symposion_core::tools::{ContentTool, PageFetcher, SearchClient};

#[derive(Parser)]
#[command(name = "symposion")]
#[command(about = "Multi-agent research chat", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to symposion.toml and SYMPOSION_CONFIG_PATH)
    #[arg(short, long, global = true, env = "SYMPOSION_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a research session
    Run {
        /// Brand or company name (asked for when omitted)
        #[arg(short, long)]
        brand: Option<String>,

        /// Goal, brief or problem statement (asked for when omitted)
        #[arg(long)]
        brief: Option<String>,

        /// Never ask a human; the user proxy sends its auto-reply instead
        #[arg(short, long)]
        unattended: bool,

        /// Override the round limit
        #[arg(long)]
        max_round: Option<usize>,
    },
    /// Run one web search and print the raw results
    Search {
        query: String,
    },
    /// Scrape a page, summarizing it when long
    Scrape {
        url: String,

        /// What the page is being read for
        #[arg(short, long)]
        objective: String,
    },
    /// Print the resolved configuration with secrets redacted
    Config,
    /// Version information
    Version,
}

/// Line-based answers from the terminal
struct TerminalInput {
    stdin: Mutex<BufReader<Stdin>>,
}

impl TerminalInput {
    fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn read_line(&self, prompt: &str) -> symposion_core::error::Result<String> {
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let mut line = String::new();
        self.stdin.lock().await.read_line(&mut line).await?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[async_trait]
impl HumanInput for TerminalInput {
    async fn ask(&self, prompt: &str) -> symposion_core::error::Result<String> {
        self.read_line(&format!("\n{}", prompt)).await
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SymposionConfig> {
    let config = match path {
        Some(path) => SymposionConfig::from_file(path),
        None => SymposionConfig::load(),
    };
    config.context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("symposion {}", env!("CARGO_PKG_VERSION"));
            println!("symposion-core {}", symposion_core::VERSION);
        }
        Commands::Config => {
            let config = load_config(cli.config.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
        Commands::Search { query } => {
            let config = load_config(cli.config.as_ref())?;
            let client = SearchClient::new(&config.search)?;
            let retry = RetryConfig::from(&config.retry);

            let body = with_retry_if(&retry, None, SymposionError::is_transient, || {
                client.search(&query)
            })
            .await?;
            println!("{}", body);
        }
        Commands::Scrape { url, objective } => {
            let config = load_config(cli.config.as_ref())?;
            let llm = LLMProviderFactory::create(&config.summarizer_llm())?;
            let summarizer = MapReduceSummarizer::from_config(llm, &config.summarizer)?;
            let tool = ContentTool::new(
                Arc::new(PageFetcher::new(&config.render)?),
                Arc::new(summarizer),
            )
            .with_threshold(config.summarizer.threshold);
            let retry = RetryConfig::from(&config.retry);

            let text = with_retry_if(&retry, None, SymposionError::is_transient, || {
                tool.run(&objective, &url)
            })
            .await?;
            println!("{}", text);
        }
        Commands::Run {
            brand,
            brief,
            unattended,
            max_round,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            config.chat.human_input = if unattended {
                HumanInputMode::Never
            } else {
                HumanInputMode::Always
            };
            if let Some(max_round) = max_round {
                config.chat.max_round = max_round;
            }

            let terminal = Arc::new(TerminalInput::new());
            let brand = match brand {
                Some(brand) => brand,
                None => terminal
                    .read_line("Please enter the brand or company name: ")
                    .await?,
            };
            let brief = match brief {
                Some(brief) => brief,
                None => terminal
                    .read_line("Please enter your goal, brief, or problem statement: ")
                    .await?,
            };

            let session = ResearchSession::builder(config)
                .with_human_input(terminal)
                .with_observer(Arc::new(|message: &ChatMessage| {
                    println!("{}\n", render_message(message));
                }))
                .build()?;

            let token = session.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, stopping after the current turn");
                    token.cancel();
                }
            });

            let outcome = session.run(&brand, &brief).await?;
            println!(
                "Session finished after {} rounds ({} messages): {}",
                outcome.rounds,
                outcome.history.len(),
                outcome.reason
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_flags(args: &[&str]) -> bool {
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Run { unattended, .. } => unattended,
            _ => panic!("expected the run command"),
        }
    }

    #[test]
    fn test_run_asks_human_unless_unattended() {
        assert!(!run_flags(&["symposion", "run", "--brand", "Acme"]));
        assert!(run_flags(&["symposion", "run", "--unattended"]));
        assert!(run_flags(&["symposion", "run", "-u"]));
        assert!(Cli::try_parse_from(["symposion", "run", "--interactive"]).is_err());
    }
}
