//! HTTP clients for the three external services: the LLM, the news search
//! API, and RSS feeds.
//!
//! Each service sits behind a trait so the scoring pipeline can be driven by
//! in-memory fakes in tests. The concrete clients are thin `reqwest`
//! wrappers; none of them retry.

pub mod news;
pub mod openai;
pub mod rss;

pub use news::{NewsApiClient, NewsArticle, NewsSearch};
pub use openai::OpenAiClient;
pub use rss::{FeedEntry, FeedSource, HttpFeedSource, parse_feed};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from API client operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client has no credentials; the named env var was unset.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Network request failed (includes timeouts).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
        /// Error type (if provided).
        error_type: Option<String>,
    },

    /// Failed to parse API response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Feed body was not well-formed XML.
    #[error("Feed error: {0}")]
    Feed(String),
}

/// Result type for API client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// One single-turn chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text-completion backend used by the scorers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `request` and return the raw reply text.
    async fn complete(&self, request: &ChatRequest) -> ApiResult<String>;
}

/// Build the shared `reqwest` client with a fixed overall timeout.
pub fn http_client(timeout: Duration) -> ApiResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("agenda-tracker/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Read an error body, preferring the `{"error":{"message","type"}}` shape
/// both OpenAI and NewsAPI (`{"message","code"}`) roughly follow.
async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();

    let (message, error_type) = match parsed {
        Some(value) => {
            let inner = value.get("error").unwrap_or(&value);
            let message = inner
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| body.clone());
            let error_type = inner
                .get("type")
                .or_else(|| inner.get("code"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            (message, error_type)
        }
        None => (body, None),
    };

    ApiError::ApiResponse {
        status,
        message,
        error_type,
    }
}
