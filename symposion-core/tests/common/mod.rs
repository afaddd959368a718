//! Shared fixtures: a local HTTP server standing in for the search and render
//! services, and scripted generation providers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use symposion_core::config::SymposionConfig;
use symposion_core::error::{Result, SymposionError};
use symposion_core::llm::{LLMProvider, LLMRequest, LLMResponse};

pub const SEARCH_KEY: &str = "serper-test";
pub const RENDER_TOKEN: &str = "browserless-test";

/// Behaviour and request log of the mock services
pub struct MockServices {
    pub search_status: u16,
    pub search_body: String,
    pub render_status: u16,
    pub pages: HashMap<String, String>,
    pub search_requests: Mutex<Vec<(Option<String>, Value)>>,
    pub render_requests: Mutex<Vec<(Option<String>, Value)>>,
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            search_status: 200,
            search_body: r#"{"organic":[]}"#.to_string(),
            render_status: 200,
            pages: HashMap::new(),
            search_requests: Mutex::new(Vec::new()),
            render_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search(mut self, status: u16, body: impl Into<String>) -> Self {
        self.search_status = status;
        self.search_body = body.into();
        self
    }

    pub fn with_render_status(mut self, status: u16) -> Self {
        self.render_status = status;
        self
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }
}

async fn search(
    State(state): State<Arc<MockServices>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let key = headers
        .get("X-API-KEY")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    state.search_requests.lock().unwrap().push((key, body));

    let status = StatusCode::from_u16(state.search_status).unwrap();
    (status, state.search_body.clone())
}

async fn render(
    State(state): State<Arc<MockServices>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let url = body["url"].as_str().unwrap_or_default().to_string();
    state
        .render_requests
        .lock()
        .unwrap()
        .push((query.get("token").cloned(), body));

    if state.render_status != 200 {
        let status = StatusCode::from_u16(state.render_status).unwrap();
        return (status, "rejected".to_string());
    }
    match state.pages.get(&url) {
        Some(html) => (StatusCode::OK, html.clone()),
        None => (StatusCode::NOT_FOUND, "no such page".to_string()),
    }
}

/// Start the mock services on an ephemeral port and return their base URL
pub async fn spawn(services: MockServices) -> (String, Arc<MockServices>) {
    let state = Arc::new(services);
    let app = Router::new()
        .route("/search", post(search))
        .route("/content", post(render))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// Configuration pointing every endpoint at the mock services
pub fn config_for(base: &str) -> SymposionConfig {
    let mut config = SymposionConfig::default();
    config.search.endpoint = format!("{}/search", base);
    config.search.api_key = Some(SEARCH_KEY.to_string());
    config.render.endpoint = format!("{}/content", base);
    config.render.api_key = Some(RENDER_TOKEN.to_string());
    config.llm.api_key = Some("unused".to_string());
    config
}

/// Plays back queued replies in order and records every request
pub struct QueueLlm {
    replies: Mutex<VecDeque<String>>,
    pub requests: Mutex<Vec<LLMRequest>>,
}

impl QueueLlm {
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for QueueLlm {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        reply
            .map(|content| LLMResponse {
                content,
                usage: None,
            })
            .ok_or_else(|| SymposionError::Validation("reply script exhausted".to_string()))
    }
}

/// Summarizes every prompt to the same short sentence and counts calls
pub struct CountingLlm {
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    reply: String,
}

impl CountingLlm {
    pub fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            reply: reply.into(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for CountingLlm {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = request.messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        Ok(LLMResponse {
            content: self.reply.clone(),
            usage: None,
        })
    }
}

/// An HTML page of short paragraphs whose visible text is exactly `chars`
/// characters long
pub fn page_with_text(chars: usize) -> String {
    let sentence = "Acme sells three plans and bills annually per seat.";
    let mut paragraphs: Vec<String> = Vec::new();
    let mut len = 0;
    while len < chars {
        let remaining = chars - len;
        if let (Some(last), true) = (paragraphs.last_mut(), remaining <= 2) {
            last.push_str(&"!".repeat(remaining));
            break;
        }
        let separator = if paragraphs.is_empty() { 0 } else { 2 };
        let take = (remaining - separator).min(sentence.len());
        let paragraph = sentence[..take].trim_end().to_string();
        len += separator + paragraph.len();
        paragraphs.push(paragraph);
    }

    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>", p)).collect();
    format!(
        "<html><head><title>Pricing</title><script>var x = 1;</script></head><body>{}</body></html>",
        body
    )
}
