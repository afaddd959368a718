//! Page fetch with conditional summarization, exposed as `web_scraping`

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

use super::fetch::PageFetch;
use super::tool::{Tool, ToolContext, ToolId, ToolMetadata, ToolParameter};
use crate::error::Result;
use crate::summarize::{DEFAULT_SUMMARY_THRESHOLD, Document, Summarize};

static DROPPED_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["script", "style", "noscript", "head"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("valid block regex")
        })
        .collect()
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|br|hr|li|ul|ol|dl|dt|dd|h[1-6]|tr|table|thead|tbody|section|article|aside|header|footer|nav|main|blockquote|pre|title|form|figure|figcaption)\b[^>]*>",
    )
    .expect("valid block tag regex")
});

static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});

static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}\f\v]+").expect("valid whitespace regex"));

/// Reduce an HTML document to readable text.
///
/// Script-like blocks and comments disappear, block-level tags become line
/// breaks, entities are decoded and runs of blank lines collapse to one.
pub fn strip_markup(html: &str) -> String {
    let mut text = html.to_string();
    for block in DROPPED_BLOCKS.iter() {
        text = block.replace_all(&text, "").into_owned();
    }
    let text = COMMENT.replace_all(&text, "");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = ENTITY.replace_all(&text, |caps: &Captures| decode_entity(&caps[0], &caps[1]));

    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;
    for line in text.lines() {
        let line = HORIZONTAL_SPACE.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        out.push_str(line);
        pending_blank = false;
    }
    out
}

fn decode_entity(raw: &str, name: &str) -> String {
    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            "ndash" => Some('\u{2013}'),
            "mdash" => Some('\u{2014}'),
            "hellip" => Some('\u{2026}'),
            "copy" => Some('\u{a9}'),
            "reg" => Some('\u{ae}'),
            _ => None,
        }
    };
    decoded.map_or_else(|| raw.to_string(), String::from)
}

/// Fetches a page and summarizes it only when the stripped text is long
pub struct ContentTool {
    fetcher: Arc<dyn PageFetch>,
    summarizer: Arc<dyn Summarize>,
    threshold: usize,
}

impl ContentTool {
    pub fn new(fetcher: Arc<dyn PageFetch>, summarizer: Arc<dyn Summarize>) -> Self {
        Self {
            fetcher,
            summarizer,
            threshold: DEFAULT_SUMMARY_THRESHOLD,
        }
    }

    /// Override the character count above which text is summarized
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Fetch `url` and return its text, summarized toward `objective` when it
    /// exceeds the threshold.
    ///
    /// # Errors
    ///
    /// Fetch errors propagate unchanged; summarization failures surface as
    /// `Summarization`.
    pub async fn run(&self, objective: &str, url: &str) -> Result<String> {
        let html = self.fetcher.fetch(url).await?;
        let text = strip_markup(&html);
        let chars = text.chars().count();

        if chars > self.threshold {
            tracing::info!(
                tool = "web_scraping",
                url = %url,
                chars,
                threshold = self.threshold,
                "Page text over threshold, summarizing"
            );
            self.summarizer
                .summarize_document(&Document::new(text, objective))
                .await
        } else {
            tracing::debug!(tool = "web_scraping", url = %url, chars, "Returning page text");
            Ok(text)
        }
    }
}

/// Arguments of `web_scraping`
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeArgs {
    pub objective: String,
    pub url: String,
}

#[async_trait]
impl Tool for ContentTool {
    type Args = ScrapeArgs;

    fn metadata(&self) -> ToolMetadata {
        ToolMetadata::new(
            ToolId::WebScraping,
            "Fetch a web page and return its text, summarized toward the objective when long",
        )
        .with_parameter(ToolParameter::required(
            "objective",
            "What the page is being read for; guides the summary",
        ))
        .with_parameter(ToolParameter::required("url", "Page URL to scrape"))
        .with_returns("Page text or a summary of it")
    }

    async fn call(&self, args: ScrapeArgs, _ctx: &ToolContext) -> Result<String> {
        self.run(&args.objective, &args.url).await
    }
}
