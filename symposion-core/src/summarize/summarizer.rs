//! Map-reduce summarization over an opaque generation provider

use async_trait::async_trait;
use std::sync::Arc;

use super::splitter::{Document, RecursiveSplitter};
use crate::config::SummarizerConfig;
use crate::error::{Result, SymposionError};
use crate::llm::{LLMConfig, LLMProvider};

/// Render the map and combine prompt
pub fn summary_prompt(objective: &str, text: &str) -> String {
    format!(
        "Write a summary of the following text for {}:\n\"{}\"\nSUMMARY:",
        objective, text
    )
}

/// Something that condenses text toward an objective
#[async_trait]
pub trait Summarize: Send + Sync {
    /// Summarize `text` for `objective`.
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`SymposionError::Summarization`]; partial
    /// results are discarded.
    async fn summarize(&self, objective: &str, text: &str) -> Result<String>;

    /// Summarize a [`Document`]
    async fn summarize_document(&self, document: &Document) -> Result<String> {
        self.summarize(&document.objective, &document.text).await
    }
}

/// Splits, summarizes each chunk, then folds the partial summaries together
pub struct MapReduceSummarizer {
    llm: Arc<dyn LLMProvider>,
    splitter: RecursiveSplitter,
    generation: LLMConfig,
}

impl MapReduceSummarizer {
    pub fn new(llm: Arc<dyn LLMProvider>, splitter: RecursiveSplitter) -> Self {
        Self {
            llm,
            splitter,
            generation: LLMConfig::new().with_temperature(0.0).with_max_tokens(1024),
        }
    }

    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Fails when the chunk settings are inconsistent.
    pub fn from_config(llm: Arc<dyn LLMProvider>, config: &SummarizerConfig) -> Result<Self> {
        let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self::new(llm, splitter).with_generation(
            LLMConfig::new()
                .with_temperature(config.temperature)
                .with_max_tokens(config.max_tokens),
        ))
    }

    pub fn with_generation(mut self, generation: LLMConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn splitter(&self) -> &RecursiveSplitter {
        &self.splitter
    }

    async fn condense(&self, objective: &str, text: &str) -> Result<String> {
        self.llm
            .generate(&summary_prompt(objective, text), &self.generation)
            .await
            .map(|s| s.trim().to_string())
            .map_err(|e| SymposionError::Summarization(e.to_string()))
    }

    /// Group summaries so each group fits `chunk_size`, never leaving a
    /// group with a single member
    fn group(&self, summaries: Vec<String>) -> Vec<Vec<String>> {
        let limit = self.splitter.chunk_size();
        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = 0;

        for summary in summaries {
            let len = summary.chars().count();
            if current.len() >= 2 && current_len + len > limit {
                groups.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current_len += len;
            current.push(summary);
        }

        if current.len() == 1 {
            if let Some(last) = groups.last_mut() {
                last.append(&mut current);
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }
}

#[async_trait]
impl Summarize for MapReduceSummarizer {
    async fn summarize(&self, objective: &str, text: &str) -> Result<String> {
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Ok(String::new());
        }

        tracing::info!(
            chunks = chunks.len(),
            chars = text.chars().count(),
            objective = %objective,
            "Summarizing content"
        );

        let mut summaries = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            summaries.push(self.condense(objective, &chunk.text).await?);
        }

        let mut pass = 0;
        while summaries.len() > 1 {
            pass += 1;
            let groups = self.group(summaries);
            tracing::debug!(pass, groups = groups.len(), "Reducing partial summaries");

            let mut next = Vec::with_capacity(groups.len());
            for group in groups {
                next.push(self.condense(objective, &group.join("\n\n")).await?);
            }
            summaries = next;
        }

        Ok(summaries.pop().unwrap_or_default())
    }
}
